//! The classification tree: node contracts, payloads and cursor protocols.
//!
//! A tree is a chain of [`Layer`]s terminated by a leaf, one layer per key
//! type. `Layer<K1, Layer<K2, Leaf<D, M>>>` classifies payloads by the key
//! chain `(K1, K2)`; `Leaf<D, M>` alone is a depth-zero tree. Every node
//! shape implements [`Tree`], which carries the insertion, merge and cursor
//! operations; recursion over the levels happens through the associated
//! types.

mod layer;
mod leaf;

#[cfg(test)]
mod test;

pub use layer::{Layer, LayerCursor, LayerCursorMut, LayerRangeCursor};
pub use leaf::{Leaf, LeafCursor, LeafCursorMut, LeafRangeCursor, UnorderedLeaf};

use crate::Merge;
use size_of::SizeOf;
use std::fmt::{self, Debug, Display, Formatter};

/// Bounds common to every value a tree stores: keys, payload data, metadata.
pub trait TreeValue: Debug + SizeOf + 'static {}

impl<T: Debug + SizeOf + 'static> TreeValue for T {}

/// Bounds on a level's key type. Keys within a node are kept strictly
/// ascending, so a total order is required; cloning is needed only by the
/// shape profile.
pub trait Key: TreeValue + Clone + Ord {}

impl<T: TreeValue + Clone + Ord> Key for T {}

/// A node of the classification tree.
///
/// Implemented by [`Layer`] (internal node), [`Leaf`] (ordered payloads) and
/// [`UnorderedLeaf`] (equality-only payloads). `Item` is the nested
/// `(key, (key, ..., Entry))` chain consumed by insertion, mirroring the
/// nesting of the node types themselves.
pub trait Tree: Default + SizeOf + Sized {
    /// Insertion item: one key per remaining level, then the payload.
    type Item;

    /// The payload type stored at the leaves.
    type Entry;

    /// Per-level predicate chain accepted by range cursors.
    type Filter: Clone;

    /// Shape profile of this subtree; see [`Tree::profile`].
    type Profile;

    /// Read-only bidirectional cursor over the payloads of this subtree.
    type Cursor<'s>: Cursor<'s, Entry = Self::Entry>
    where
        Self: 's;

    /// Mutable bidirectional cursor.
    type CursorMut<'s>: CursorMut<'s, Entry = Self::Entry>
    where
        Self: 's;

    /// Predicate-filtered bidirectional cursor.
    type RangeCursor<'s>: RangeCursor<'s, Entry = Self::Entry>
    where
        Self: 's;

    /// Inserts `item`, deduplicating the payload.
    ///
    /// Returns true if a new payload was stored. When the payload already
    /// exists under the same key chain, its metadata absorbs the incoming
    /// metadata and the size is unchanged.
    fn add(&mut self, item: Self::Item) -> bool;

    /// Inserts `item`, keeping duplicates.
    ///
    /// Always stores the payload and returns true.
    fn add_all(&mut self, item: Self::Item) -> bool;

    /// Append-only insertion into a subtree known to contain no payload with
    /// `item`'s key chain.
    ///
    /// Used on the freshly created path below a new key, where every level
    /// can skip its search. Calling this with a key chain that is already
    /// present breaks the sibling-order invariant.
    fn add_new(&mut self, item: Self::Item);

    /// Unions `other` into `self`, deduplicating payloads; returns the
    /// number of payloads added.
    ///
    /// Subtrees of `other` under keys absent here are moved in whole,
    /// without a recursive copy.
    fn merge(&mut self, other: Self) -> usize;

    /// Unions `other` into `self`, keeping duplicate payloads.
    fn merge_all(&mut self, other: Self) -> usize;

    /// The number of payloads stored below this node.
    fn size(&self) -> usize;

    /// The number of children of this node; zero for leaves.
    fn num_keys(&self) -> usize;

    /// True if no payload is stored below this node.
    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Removes every payload and resets the cached size.
    fn clear(&mut self);

    /// Recomputes the payload count by full rescan, repairing and returning
    /// the cached size.
    fn recompute_size(&mut self) -> usize;

    /// Reserves room for `additional` children (or leaf payloads).
    fn reserve(&mut self, additional: usize);

    /// Estimated heap + inline footprint of this subtree, in bytes.
    fn num_bytes(&self) -> usize {
        self.size_of().total_bytes()
    }

    /// The number of payloads whose full key chain satisfies `filter`,
    /// independent of any cursor state.
    fn count_matching(&self, filter: &Self::Filter) -> usize;

    /// Extracts the shape of this subtree: every key at every level and each
    /// leaf's payload count.
    fn profile(&self) -> Self::Profile;

    /// Pre-sizes an empty subtree from a profile: recreates the keys at
    /// every level and reserves leaf capacity, leaving all sizes zero for a
    /// subsequent bulk insertion.
    fn presize(&mut self, profile: &Self::Profile);

    /// A cursor positioned on the first payload (or at the sentinel state if
    /// the subtree is empty).
    fn cursor(&self) -> Self::Cursor<'_>;

    /// A cursor positioned on the last payload.
    fn cursor_at_end(&self) -> Self::Cursor<'_>;

    /// Mutable counterpart of [`Tree::cursor`].
    fn cursor_mut(&mut self) -> Self::CursorMut<'_>;

    /// Mutable counterpart of [`Tree::cursor_at_end`].
    fn cursor_mut_at_end(&mut self) -> Self::CursorMut<'_>;

    /// A filtered cursor positioned on the first payload whose key chain
    /// satisfies `filter`.
    fn range_cursor(&self, filter: Self::Filter) -> Self::RangeCursor<'_>;

    /// A filtered cursor positioned on the last matching payload.
    fn range_cursor_at_end(&self, filter: Self::Filter) -> Self::RangeCursor<'_>;
}

/// Recursive plain-text rendering of a tree.
pub trait TreePrint {
    /// Appends this subtree to `out`, one header per node; leaf payload
    /// lines are included only when `show_entries` is set.
    fn print(&self, out: &mut String, show_entries: bool);
}

/// Cursor position within one node, mirrored at every level.
///
/// `PastBegin` is the virtual position one step before the first payload and
/// `End` one step past the last, so both directions of iteration terminate
/// on a sentinel instead of wrapping or going out of bounds. `At` carries
/// the nested cursor, which makes "positioned but child unpositioned"
/// unrepresentable.
#[derive(Clone, Debug)]
pub enum Position<Sub> {
    /// One step before the first payload.
    PastBegin,
    /// On a payload: sibling index plus the cursor into that child.
    At {
        /// Index into the node's children (or leaf entries).
        idx: usize,
        /// Cursor over the child at `idx`; `()` at the leaf level.
        sub: Sub,
    },
    /// One step past the last payload.
    End,
}

/// Read-only bidirectional cursor over the payloads of a subtree.
///
/// Movement is total: stepping at `End` and stepping back at `PastBegin`
/// are no-ops. Dereferencing at either sentinel panics.
pub trait Cursor<'s> {
    /// The payload type.
    type Entry;

    /// The key chain of the current payload, one borrowed key per level.
    type KeyPath;

    /// Moves to the first payload; the empty tree goes to `PastBegin`.
    fn rewind(&mut self);

    /// Moves to the last payload; the empty tree goes to `PastBegin`.
    fn fast_forward(&mut self);

    /// Moves one payload forward. From `PastBegin` this lands on the same
    /// position `rewind` produces; from the last payload it lands on `End`.
    fn step(&mut self);

    /// Moves one payload backward. From `End` this lands on the same
    /// position `fast_forward` produces; from the first payload it lands on
    /// `PastBegin`.
    fn step_reverse(&mut self);

    /// True when positioned on the first payload.
    fn is_begin(&self) -> bool;

    /// True when before the first payload (always true for an empty tree).
    fn is_past_begin(&self) -> bool;

    /// True when past the last payload (always true for an empty tree).
    fn is_end(&self) -> bool;

    /// The current payload.
    ///
    /// Panics when the cursor is at a sentinel position.
    fn entry(&self) -> &'s Self::Entry;

    /// The current payload together with its full key chain.
    ///
    /// Panics when the cursor is at a sentinel position.
    fn keyed_entry(&self) -> (Self::KeyPath, &'s Self::Entry);
}

/// Mutable bidirectional cursor; movement protocol as [`Cursor`].
pub trait CursorMut<'s> {
    /// The payload type.
    type Entry;

    /// The key chain of the current payload.
    type KeyPath<'a>
    where
        Self: 'a;

    /// See [`Cursor::rewind`].
    fn rewind(&mut self);

    /// See [`Cursor::fast_forward`].
    fn fast_forward(&mut self);

    /// See [`Cursor::step`].
    fn step(&mut self);

    /// See [`Cursor::step_reverse`].
    fn step_reverse(&mut self);

    /// See [`Cursor::is_begin`].
    fn is_begin(&self) -> bool;

    /// See [`Cursor::is_past_begin`].
    fn is_past_begin(&self) -> bool;

    /// See [`Cursor::is_end`].
    fn is_end(&self) -> bool;

    /// The current payload. Panics at a sentinel position.
    fn entry(&self) -> &Self::Entry;

    /// Mutable access to the current payload. Panics at a sentinel
    /// position.
    ///
    /// Mutating payload data must preserve the leaf's ordering and
    /// uniqueness invariants; metadata can be changed freely.
    fn entry_mut(&mut self) -> &mut Self::Entry;

    /// The current payload with its key chain. Panics at a sentinel
    /// position.
    fn keyed_entry(&self) -> (Self::KeyPath<'_>, &Self::Entry);
}

/// Predicate-filtered bidirectional cursor.
///
/// A payload is visible only if every level's key satisfies that level's
/// predicate. Each level lazily discovers the half-open window of sibling
/// indices that can lead to a visible payload and steps within it,
/// re-checking the predicate on every sibling move.
pub trait RangeCursor<'s> {
    /// The payload type.
    type Entry;

    /// The key chain of the current payload.
    type KeyPath;

    /// Moves to the first visible payload. Returns false when nothing below
    /// this node matches, leaving the cursor with both
    /// [`RangeCursor::is_past_begin`] and [`RangeCursor::is_end`] true.
    fn rewind(&mut self) -> bool;

    /// Moves to the last visible payload; returns false when nothing
    /// matches.
    fn fast_forward(&mut self) -> bool;

    /// Moves one visible payload forward.
    fn step(&mut self);

    /// Moves one visible payload backward.
    fn step_reverse(&mut self);

    /// True when positioned on the first visible payload.
    fn is_begin(&self) -> bool;

    /// True when before the first visible payload, or when nothing matches.
    fn is_past_begin(&self) -> bool;

    /// True when past the last visible payload, or when nothing matches.
    fn is_end(&self) -> bool;

    /// The current payload. Panics at a sentinel position.
    fn entry(&self) -> &'s Self::Entry;

    /// The current payload with its key chain. Panics at a sentinel
    /// position.
    fn keyed_entry(&self) -> (Self::KeyPath, &'s Self::Entry);

    /// The number of visible payloads, counted by a fresh scan that ignores
    /// and preserves the cursor position.
    fn count(&self) -> usize;
}

/// Payload: the deduplicated value plus its metadata accumulator.
///
/// Trees without metadata use the [`NoMeta`] placeholder, which is the
/// default for the `M` parameter throughout the crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, SizeOf)]
pub struct Entry<D, M = NoMeta> {
    /// The value being classified and deduplicated.
    pub data: D,
    /// Accumulator combined across duplicates of `data`.
    pub meta: M,
}

impl<D, M> Entry<D, M> {
    /// Creates a payload from its value and metadata.
    pub fn new(data: D, meta: M) -> Self {
        Self { data, meta }
    }
}

impl<D> From<D> for Entry<D, NoMeta> {
    fn from(data: D) -> Self {
        Self { data, meta: NoMeta }
    }
}

impl<D: Display, M: Display> Display for Entry<D, M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)?;
        let meta = self.meta.to_string();
        if !meta.is_empty() {
            write!(f, " {{{meta}}}")?;
        }
        Ok(())
    }
}

/// Metadata placeholder for trees that only deduplicate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, SizeOf)]
pub struct NoMeta;

impl Merge for NoMeta {
    fn merge(&mut self, _: Self) {}
}

impl Display for NoMeta {
    fn fmt(&self, _: &mut Formatter<'_>) -> fmt::Result {
        Ok(())
    }
}

#[cold]
#[inline(never)]
pub(crate) fn invalid_position() -> ! {
    panic!("cursor dereferenced at a sentinel position")
}
