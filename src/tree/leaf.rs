//! Leaf nodes: the bottom of a tree, where payloads live.
//!
//! Two flavors with the same surface. [`Leaf`] requires ordered payload
//! data, keeps its entries ascending and locates them with the hybrid
//! lower-bound search. [`UnorderedLeaf`] requires only equality and locates
//! entries by linear scan; store-all insertions append at the back. The
//! cursor types are shared by both, since a cursor only ever sees the entry
//! slice.

use crate::profile::LeafProfile;
use crate::search::search;
use crate::tree::{
    invalid_position, Cursor, CursorMut, Entry, NoMeta, Position, RangeCursor, Tree, TreePrint,
    TreeValue,
};
use crate::Merge;
use size_of::SizeOf;
use std::fmt::{self, Display, Formatter};

/// A leaf holding entries sorted ascending by their data.
///
/// Unique-mode insertion keeps one entry per distinct data value; store-all
/// insertion places duplicates at their sorted position so the binary search
/// stays valid for later probes.
#[derive(Clone, Debug, PartialEq, Eq, SizeOf)]
pub struct Leaf<D, M = NoMeta> {
    entries: Vec<Entry<D, M>>,
}

impl<D, M> Default for Leaf<D, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, M> Leaf<D, M> {
    /// Creates an empty leaf.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The stored entries, ascending by data.
    pub fn entries(&self) -> &[Entry<D, M>] {
        &self.entries
    }

    /// The entry at `idx`. Panics when `idx >= size()`.
    pub fn entry(&self, idx: usize) -> &Entry<D, M> {
        &self.entries[idx]
    }

    /// Mutable access to the entry at `idx`. Panics when `idx >= size()`.
    ///
    /// Replacing the data value (rather than the metadata) can break the
    /// leaf's ordering invariant.
    pub fn entry_mut(&mut self, idx: usize) -> &mut Entry<D, M> {
        &mut self.entries[idx]
    }
}

impl<D: Ord, M> Leaf<D, M> {
    /// Locates the entry with the given data value.
    pub fn find(&self, data: &D) -> Option<&Entry<D, M>> {
        let (idx, found) = search(&self.entries, data, |e| &e.data);
        found.then(|| &self.entries[idx])
    }
}

impl<D, M> Tree for Leaf<D, M>
where
    D: TreeValue + Ord,
    M: TreeValue + Merge,
{
    type Item = Entry<D, M>;
    type Entry = Entry<D, M>;
    type Filter = ();
    type Profile = LeafProfile;
    type Cursor<'s>
        = LeafCursor<'s, D, M>
    where
        Self: 's;
    type CursorMut<'s>
        = LeafCursorMut<'s, D, M>
    where
        Self: 's;
    type RangeCursor<'s>
        = LeafRangeCursor<'s, D, M>
    where
        Self: 's;

    fn add(&mut self, item: Self::Item) -> bool {
        let (idx, found) = search(&self.entries, &item.data, |e| &e.data);
        if found {
            self.entries[idx].meta.merge(item.meta);
            false
        } else {
            self.entries.insert(idx, item);
            true
        }
    }

    fn add_all(&mut self, item: Self::Item) -> bool {
        let (idx, _) = search(&self.entries, &item.data, |e| &e.data);
        self.entries.insert(idx, item);
        true
    }

    fn add_new(&mut self, item: Self::Item) {
        self.entries.push(item);
    }

    fn merge(&mut self, other: Self) -> usize {
        other
            .entries
            .into_iter()
            .map(|entry| self.add(entry) as usize)
            .sum()
    }

    fn merge_all(&mut self, other: Self) -> usize {
        let added = other.entries.len();
        for entry in other.entries {
            self.add_all(entry);
        }
        added
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn num_keys(&self) -> usize {
        0
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn recompute_size(&mut self) -> usize {
        self.entries.len()
    }

    fn reserve(&mut self, additional: usize) {
        self.entries.reserve(additional);
    }

    fn count_matching(&self, _filter: &Self::Filter) -> usize {
        self.entries.len()
    }

    fn profile(&self) -> Self::Profile {
        LeafProfile {
            len: self.entries.len(),
        }
    }

    fn presize(&mut self, profile: &Self::Profile) {
        self.entries.reserve(profile.len);
    }

    fn cursor(&self) -> Self::Cursor<'_> {
        let mut cursor = LeafCursor {
            entries: &self.entries,
            pos: Position::PastBegin,
        };
        cursor.rewind();
        cursor
    }

    fn cursor_at_end(&self) -> Self::Cursor<'_> {
        let mut cursor = LeafCursor {
            entries: &self.entries,
            pos: Position::PastBegin,
        };
        cursor.fast_forward();
        cursor
    }

    fn cursor_mut(&mut self) -> Self::CursorMut<'_> {
        let mut cursor = LeafCursorMut {
            entries: &mut self.entries,
            pos: Position::PastBegin,
        };
        cursor.rewind();
        cursor
    }

    fn cursor_mut_at_end(&mut self) -> Self::CursorMut<'_> {
        let mut cursor = LeafCursorMut {
            entries: &mut self.entries,
            pos: Position::PastBegin,
        };
        cursor.fast_forward();
        cursor
    }

    fn range_cursor(&self, _filter: Self::Filter) -> Self::RangeCursor<'_> {
        let mut cursor = LeafRangeCursor {
            entries: &self.entries,
            pos: Position::PastBegin,
        };
        cursor.rewind();
        cursor
    }

    fn range_cursor_at_end(&self, _filter: Self::Filter) -> Self::RangeCursor<'_> {
        let mut cursor = LeafRangeCursor {
            entries: &self.entries,
            pos: Position::PastBegin,
        };
        cursor.fast_forward();
        cursor
    }
}

/// A leaf for payload data supporting equality only.
///
/// Entries are unordered; lookups scan linearly and store-all insertions
/// append at the back.
#[derive(Clone, Debug, PartialEq, Eq, SizeOf)]
pub struct UnorderedLeaf<D, M = NoMeta> {
    entries: Vec<Entry<D, M>>,
}

impl<D, M> Default for UnorderedLeaf<D, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, M> UnorderedLeaf<D, M> {
    /// Creates an empty leaf.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The stored entries, in insertion order.
    pub fn entries(&self) -> &[Entry<D, M>] {
        &self.entries
    }

    /// The entry at `idx`. Panics when `idx >= size()`.
    pub fn entry(&self, idx: usize) -> &Entry<D, M> {
        &self.entries[idx]
    }

    /// Mutable access to the entry at `idx`. Panics when `idx >= size()`.
    ///
    /// Replacing the data value can break the leaf's uniqueness invariant.
    pub fn entry_mut(&mut self, idx: usize) -> &mut Entry<D, M> {
        &mut self.entries[idx]
    }
}

impl<D: PartialEq, M> UnorderedLeaf<D, M> {
    /// Locates the entry with the given data value by linear scan.
    pub fn find(&self, data: &D) -> Option<&Entry<D, M>> {
        self.entries.iter().find(|entry| entry.data == *data)
    }
}

impl<D, M> Tree for UnorderedLeaf<D, M>
where
    D: TreeValue + PartialEq,
    M: TreeValue + Merge,
{
    type Item = Entry<D, M>;
    type Entry = Entry<D, M>;
    type Filter = ();
    type Profile = LeafProfile;
    type Cursor<'s>
        = LeafCursor<'s, D, M>
    where
        Self: 's;
    type CursorMut<'s>
        = LeafCursorMut<'s, D, M>
    where
        Self: 's;
    type RangeCursor<'s>
        = LeafRangeCursor<'s, D, M>
    where
        Self: 's;

    fn add(&mut self, item: Self::Item) -> bool {
        match self.entries.iter_mut().find(|entry| entry.data == item.data) {
            Some(existing) => {
                existing.meta.merge(item.meta);
                false
            }
            None => {
                self.entries.push(item);
                true
            }
        }
    }

    fn add_all(&mut self, item: Self::Item) -> bool {
        self.entries.push(item);
        true
    }

    fn add_new(&mut self, item: Self::Item) {
        self.entries.push(item);
    }

    fn merge(&mut self, other: Self) -> usize {
        other
            .entries
            .into_iter()
            .map(|entry| self.add(entry) as usize)
            .sum()
    }

    fn merge_all(&mut self, other: Self) -> usize {
        let added = other.entries.len();
        self.entries.extend(other.entries);
        added
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn num_keys(&self) -> usize {
        0
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn recompute_size(&mut self) -> usize {
        self.entries.len()
    }

    fn reserve(&mut self, additional: usize) {
        self.entries.reserve(additional);
    }

    fn count_matching(&self, _filter: &Self::Filter) -> usize {
        self.entries.len()
    }

    fn profile(&self) -> Self::Profile {
        LeafProfile {
            len: self.entries.len(),
        }
    }

    fn presize(&mut self, profile: &Self::Profile) {
        self.entries.reserve(profile.len);
    }

    fn cursor(&self) -> Self::Cursor<'_> {
        let mut cursor = LeafCursor {
            entries: &self.entries,
            pos: Position::PastBegin,
        };
        cursor.rewind();
        cursor
    }

    fn cursor_at_end(&self) -> Self::Cursor<'_> {
        let mut cursor = LeafCursor {
            entries: &self.entries,
            pos: Position::PastBegin,
        };
        cursor.fast_forward();
        cursor
    }

    fn cursor_mut(&mut self) -> Self::CursorMut<'_> {
        let mut cursor = LeafCursorMut {
            entries: &mut self.entries,
            pos: Position::PastBegin,
        };
        cursor.rewind();
        cursor
    }

    fn cursor_mut_at_end(&mut self) -> Self::CursorMut<'_> {
        let mut cursor = LeafCursorMut {
            entries: &mut self.entries,
            pos: Position::PastBegin,
        };
        cursor.fast_forward();
        cursor
    }

    fn range_cursor(&self, _filter: Self::Filter) -> Self::RangeCursor<'_> {
        let mut cursor = LeafRangeCursor {
            entries: &self.entries,
            pos: Position::PastBegin,
        };
        cursor.rewind();
        cursor
    }

    fn range_cursor_at_end(&self, _filter: Self::Filter) -> Self::RangeCursor<'_> {
        let mut cursor = LeafRangeCursor {
            entries: &self.entries,
            pos: Position::PastBegin,
        };
        cursor.fast_forward();
        cursor
    }
}

/// Read-only cursor over a leaf's entries.
pub struct LeafCursor<'s, D, M> {
    entries: &'s [Entry<D, M>],
    pos: Position<()>,
}

impl<'s, D, M> Clone for LeafCursor<'s, D, M> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries,
            pos: self.pos.clone(),
        }
    }
}

impl<'s, D, M> Cursor<'s> for LeafCursor<'s, D, M> {
    type Entry = Entry<D, M>;
    type KeyPath = ();

    fn rewind(&mut self) {
        self.pos = if self.entries.is_empty() {
            Position::PastBegin
        } else {
            Position::At { idx: 0, sub: () }
        };
    }

    fn fast_forward(&mut self) {
        self.pos = if self.entries.is_empty() {
            Position::PastBegin
        } else {
            Position::At {
                idx: self.entries.len() - 1,
                sub: (),
            }
        };
    }

    fn step(&mut self) {
        match self.pos {
            Position::PastBegin => self.rewind(),
            Position::At { idx, .. } => {
                self.pos = if idx + 1 < self.entries.len() {
                    Position::At {
                        idx: idx + 1,
                        sub: (),
                    }
                } else {
                    Position::End
                };
            }
            Position::End => {}
        }
    }

    fn step_reverse(&mut self) {
        match self.pos {
            Position::End => self.fast_forward(),
            Position::At { idx, .. } => {
                self.pos = if idx == 0 {
                    Position::PastBegin
                } else {
                    Position::At {
                        idx: idx - 1,
                        sub: (),
                    }
                };
            }
            Position::PastBegin => {}
        }
    }

    fn is_begin(&self) -> bool {
        matches!(self.pos, Position::At { idx: 0, .. })
    }

    fn is_past_begin(&self) -> bool {
        self.entries.is_empty() || matches!(self.pos, Position::PastBegin)
    }

    fn is_end(&self) -> bool {
        self.entries.is_empty() || matches!(self.pos, Position::End)
    }

    fn entry(&self) -> &'s Entry<D, M> {
        match self.pos {
            Position::At { idx, .. } => &self.entries[idx],
            _ => invalid_position(),
        }
    }

    fn keyed_entry(&self) -> (Self::KeyPath, &'s Entry<D, M>) {
        ((), self.entry())
    }
}

/// Mutable cursor over a leaf's entries.
pub struct LeafCursorMut<'s, D, M> {
    entries: &'s mut [Entry<D, M>],
    pos: Position<()>,
}

impl<'s, D, M> CursorMut<'s> for LeafCursorMut<'s, D, M> {
    type Entry = Entry<D, M>;
    type KeyPath<'a>
        = ()
    where
        Self: 'a;

    fn rewind(&mut self) {
        self.pos = if self.entries.is_empty() {
            Position::PastBegin
        } else {
            Position::At { idx: 0, sub: () }
        };
    }

    fn fast_forward(&mut self) {
        self.pos = if self.entries.is_empty() {
            Position::PastBegin
        } else {
            Position::At {
                idx: self.entries.len() - 1,
                sub: (),
            }
        };
    }

    fn step(&mut self) {
        match self.pos {
            Position::PastBegin => self.rewind(),
            Position::At { idx, .. } => {
                self.pos = if idx + 1 < self.entries.len() {
                    Position::At {
                        idx: idx + 1,
                        sub: (),
                    }
                } else {
                    Position::End
                };
            }
            Position::End => {}
        }
    }

    fn step_reverse(&mut self) {
        match self.pos {
            Position::End => self.fast_forward(),
            Position::At { idx, .. } => {
                self.pos = if idx == 0 {
                    Position::PastBegin
                } else {
                    Position::At {
                        idx: idx - 1,
                        sub: (),
                    }
                };
            }
            Position::PastBegin => {}
        }
    }

    fn is_begin(&self) -> bool {
        matches!(self.pos, Position::At { idx: 0, .. })
    }

    fn is_past_begin(&self) -> bool {
        self.entries.is_empty() || matches!(self.pos, Position::PastBegin)
    }

    fn is_end(&self) -> bool {
        self.entries.is_empty() || matches!(self.pos, Position::End)
    }

    fn entry(&self) -> &Entry<D, M> {
        match self.pos {
            Position::At { idx, .. } => &self.entries[idx],
            _ => invalid_position(),
        }
    }

    fn entry_mut(&mut self) -> &mut Entry<D, M> {
        match self.pos {
            Position::At { idx, .. } => &mut self.entries[idx],
            _ => invalid_position(),
        }
    }

    fn keyed_entry(&self) -> (Self::KeyPath<'_>, &Entry<D, M>) {
        ((), self.entry())
    }
}

/// Filtered cursor over a leaf's entries.
///
/// Leaves carry no key, so there is nothing to filter; this is the plain
/// cursor plus the probing and counting surface of [`RangeCursor`].
pub struct LeafRangeCursor<'s, D, M> {
    entries: &'s [Entry<D, M>],
    pos: Position<()>,
}

impl<'s, D, M> Clone for LeafRangeCursor<'s, D, M> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries,
            pos: self.pos.clone(),
        }
    }
}

impl<'s, D, M> RangeCursor<'s> for LeafRangeCursor<'s, D, M> {
    type Entry = Entry<D, M>;
    type KeyPath = ();

    fn rewind(&mut self) -> bool {
        if self.entries.is_empty() {
            self.pos = Position::PastBegin;
            false
        } else {
            self.pos = Position::At { idx: 0, sub: () };
            true
        }
    }

    fn fast_forward(&mut self) -> bool {
        if self.entries.is_empty() {
            self.pos = Position::PastBegin;
            false
        } else {
            self.pos = Position::At {
                idx: self.entries.len() - 1,
                sub: (),
            };
            true
        }
    }

    fn step(&mut self) {
        match self.pos {
            Position::PastBegin => {
                self.rewind();
            }
            Position::At { idx, .. } => {
                self.pos = if idx + 1 < self.entries.len() {
                    Position::At {
                        idx: idx + 1,
                        sub: (),
                    }
                } else {
                    Position::End
                };
            }
            Position::End => {}
        }
    }

    fn step_reverse(&mut self) {
        match self.pos {
            Position::End => {
                self.fast_forward();
            }
            Position::At { idx, .. } => {
                self.pos = if idx == 0 {
                    Position::PastBegin
                } else {
                    Position::At {
                        idx: idx - 1,
                        sub: (),
                    }
                };
            }
            Position::PastBegin => {}
        }
    }

    fn is_begin(&self) -> bool {
        matches!(self.pos, Position::At { idx: 0, .. })
    }

    fn is_past_begin(&self) -> bool {
        self.entries.is_empty() || matches!(self.pos, Position::PastBegin)
    }

    fn is_end(&self) -> bool {
        self.entries.is_empty() || matches!(self.pos, Position::End)
    }

    fn entry(&self) -> &'s Entry<D, M> {
        match self.pos {
            Position::At { idx, .. } => &self.entries[idx],
            _ => invalid_position(),
        }
    }

    fn keyed_entry(&self) -> (Self::KeyPath, &'s Entry<D, M>) {
        ((), self.entry())
    }

    fn count(&self) -> usize {
        self.entries.len()
    }
}

fn print_entries<D: Display, M: Display>(
    entries: &[Entry<D, M>],
    out: &mut String,
    show_entries: bool,
) {
    out.push_str(&format!("size: {}\n", entries.len()));
    if show_entries {
        for (idx, entry) in entries.iter().enumerate() {
            let branch = if idx + 1 == entries.len() {
                "└── "
            } else {
                "├── "
            };
            out.push_str(&format!("{branch}{entry}\n"));
        }
    }
}

impl<D: Display, M: Display> TreePrint for Leaf<D, M> {
    fn print(&self, out: &mut String, show_entries: bool) {
        print_entries(&self.entries, out, show_entries);
    }
}

impl<D: Display, M: Display> TreePrint for UnorderedLeaf<D, M> {
    fn print(&self, out: &mut String, show_entries: bool) {
        print_entries(&self.entries, out, show_entries);
    }
}

impl<D: Display, M: Display> Display for Leaf<D, M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut rendered = String::new();
        self.print(&mut rendered, true);
        f.write_str(&rendered)
    }
}

impl<D: Display, M: Display> Display for UnorderedLeaf<D, M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut rendered = String::new();
        self.print(&mut rendered, true);
        f.write_str(&rendered)
    }
}
