//! An in-memory, multi-level classification index.
//!
//! `strata` tabulates how many distinct objects fall into each combination
//! of classification criteria. An object reduces to a chain of key values —
//! one per tree level — plus a payload: a value to deduplicate and an
//! optional metadata accumulator. Objects sharing a key chain land in the
//! same bucket; within a bucket, payloads that compare equal collapse into
//! one entry whose metadata absorbs every duplicate.
//!
//! The tree is spelled by nesting the node types, one [`Layer`] per key
//! type, terminated by a [`Leaf`] (or an [`UnorderedLeaf`] when the payload
//! data supports only equality). The [`Depth0`]–[`Depth3`] aliases cover
//! the common shapes. All operations live on the [`Tree`] trait;
//! bidirectional traversal is provided by [`Cursor`]/[`CursorMut`] and
//! predicate-filtered traversal by [`RangeCursor`].
//!
//! ```
//! use strata::{any_key, key_equals, Cursor, Depth2, Entry, RangeCursor, Tree};
//!
//! let mut index = Depth2::<u32, u32, String, u64>::default();
//! index.add((1, (1, Entry::new("alpha".to_owned(), 1))));
//! index.add((1, (1, Entry::new("alpha".to_owned(), 1)))); // duplicate: merges
//! index.add((1, (2, Entry::new("beta".to_owned(), 1))));
//! index.add((2, (1, Entry::new("gamma".to_owned(), 1))));
//!
//! assert_eq!(index.size(), 3);
//! assert_eq!(index.sizes(), vec![2, 1]);
//!
//! let mut seen = Vec::new();
//! let mut cursor = index.cursor();
//! while !cursor.is_end() {
//!     seen.push(cursor.entry().data.clone());
//!     cursor.step();
//! }
//! assert_eq!(seen, vec!["alpha", "beta", "gamma"]);
//!
//! let filtered = index.range_cursor((key_equals(1), (any_key(), ())));
//! assert_eq!(filtered.count(), 2);
//! ```
//!
//! Mutation requires `&mut` access and cursors borrow the tree, so the
//! borrow checker rules out structural changes while a traversal is live;
//! there is no internal synchronization.

mod filter;
mod merge;
mod tree;

pub mod profile;
pub mod search;

pub use filter::{any_key, key_equals, key_in, key_matches, KeyPredicate};
pub use merge::Merge;
pub use tree::{
    Cursor, CursorMut, Entry, Key, Layer, LayerCursor, LayerCursorMut, LayerRangeCursor, Leaf,
    LeafCursor, LeafCursorMut, LeafRangeCursor, NoMeta, Position, RangeCursor, Tree, TreePrint,
    TreeValue, UnorderedLeaf,
};

/// A depth-0 tree: a bare leaf, no classification keys.
pub type Depth0<D, M = NoMeta> = Leaf<D, M>;

/// A tree classifying by one key.
pub type Depth1<K1, D, M = NoMeta> = Layer<K1, Leaf<D, M>>;

/// A tree classifying by two keys.
pub type Depth2<K1, K2, D, M = NoMeta> = Layer<K1, Layer<K2, Leaf<D, M>>>;

/// A tree classifying by three keys.
pub type Depth3<K1, K2, K3, D, M = NoMeta> = Layer<K1, Layer<K2, Layer<K3, Leaf<D, M>>>>;
