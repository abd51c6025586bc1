//! Internal nodes: one layer of the tree per key type.
//!
//! A [`Layer`] owns a key-sorted vector of `(key, child)` pairs and a cached
//! count of the payloads reachable through it. The child type is the next
//! layer down, so a full tree is spelled by nesting the generic:
//! `Layer<K1, Layer<K2, Leaf<D, M>>>`.

use crate::filter::KeyPredicate;
use crate::profile::LayerProfile;
use crate::search::search;
use crate::tree::{
    invalid_position, Cursor, CursorMut, Key, Position, RangeCursor, Tree, TreePrint,
};
use size_of::SizeOf;
use std::fmt::{self, Display, Formatter};
use std::marker::PhantomData;
use std::ptr::NonNull;
use textwrap::indent;

/// An internal node of the classification tree.
///
/// Sibling keys are pairwise distinct and strictly ascending; `size` caches
/// the number of payloads stored below this node and is maintained
/// incrementally by every insertion and merge.
#[derive(Clone, Debug, PartialEq, Eq, SizeOf)]
pub struct Layer<K, C> {
    /// Key-sorted children. The invariants are maintained by going through
    /// [`Tree::add`] and friends; they are what makes the lower-bound
    /// search valid.
    children: Vec<(K, C)>,
    /// Payloads reachable through this node.
    size: usize,
}

impl<K, C> Layer<K, C> {
    /// Creates an empty layer.
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            size: 0,
        }
    }

    /// The key of the `idx`-th child. Panics when `idx >= num_keys()`.
    pub fn key(&self, idx: usize) -> &K {
        &self.children[idx].0
    }

    /// The `idx`-th child. Panics when `idx >= num_keys()`.
    pub fn child(&self, idx: usize) -> &C {
        &self.children[idx].1
    }

    /// Mutable access to the `idx`-th child. Panics when
    /// `idx >= num_keys()`.
    ///
    /// Inserting into the child through this reference leaves this node's
    /// cached size stale until [`Tree::recompute_size`] runs.
    pub fn child_mut(&mut self, idx: usize) -> &mut C {
        &mut self.children[idx].1
    }

    /// The `(key, child)` pairs, ascending by key.
    pub fn pairs(&self) -> &[(K, C)] {
        &self.children
    }
}

impl<K, C: Tree> Layer<K, C> {
    /// Per-child payload counts, in key order.
    pub fn sizes(&self) -> Vec<usize> {
        self.children.iter().map(|(_, child)| child.size()).collect()
    }
}

impl<K, C> Default for Layer<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, C> Tree for Layer<K, C>
where
    K: Key,
    C: Tree,
{
    type Item = (K, C::Item);
    type Entry = C::Entry;
    type Filter = (KeyPredicate<K>, C::Filter);
    type Profile = LayerProfile<K, C::Profile>;
    type Cursor<'s>
        = LayerCursor<'s, K, C>
    where
        Self: 's;
    type CursorMut<'s>
        = LayerCursorMut<'s, K, C>
    where
        Self: 's;
    type RangeCursor<'s>
        = LayerRangeCursor<'s, K, C>
    where
        Self: 's;

    fn add(&mut self, (key, rest): Self::Item) -> bool {
        let (idx, found) = search(&self.children, &key, |(k, _)| k);
        if found {
            let added = self.children[idx].1.add(rest);
            self.size += added as usize;
            added
        } else {
            // First payload under this key: the whole path below is fresh,
            // so every level can append without searching.
            let mut child = C::default();
            child.add_new(rest);
            self.children.insert(idx, (key, child));
            self.size += 1;
            true
        }
    }

    fn add_all(&mut self, (key, rest): Self::Item) -> bool {
        let (idx, found) = search(&self.children, &key, |(k, _)| k);
        if found {
            let added = self.children[idx].1.add_all(rest);
            self.size += added as usize;
            added
        } else {
            let mut child = C::default();
            child.add_new(rest);
            self.children.insert(idx, (key, child));
            self.size += 1;
            true
        }
    }

    fn add_new(&mut self, (key, rest): Self::Item) {
        let mut child = C::default();
        child.add_new(rest);
        self.children.push((key, child));
        self.size += 1;
    }

    fn merge(&mut self, other: Self) -> usize {
        let mut added = 0;
        for (key, child) in other.children {
            let (idx, found) = search(&self.children, &key, |(k, _)| k);
            if found {
                added += self.children[idx].1.merge(child);
            } else {
                // Transplant the whole subtree; its cached size moves with
                // it.
                added += child.size();
                self.children.insert(idx, (key, child));
            }
        }
        self.size += added;
        added
    }

    fn merge_all(&mut self, other: Self) -> usize {
        let mut added = 0;
        for (key, child) in other.children {
            let (idx, found) = search(&self.children, &key, |(k, _)| k);
            if found {
                added += self.children[idx].1.merge_all(child);
            } else {
                added += child.size();
                self.children.insert(idx, (key, child));
            }
        }
        self.size += added;
        added
    }

    fn size(&self) -> usize {
        self.size
    }

    fn num_keys(&self) -> usize {
        self.children.len()
    }

    fn clear(&mut self) {
        self.children.clear();
        self.size = 0;
    }

    fn recompute_size(&mut self) -> usize {
        let total = self
            .children
            .iter_mut()
            .map(|(_, child)| child.recompute_size())
            .sum();
        self.size = total;
        total
    }

    fn reserve(&mut self, additional: usize) {
        self.children.reserve(additional);
    }

    fn count_matching(&self, filter: &Self::Filter) -> usize {
        self.children
            .iter()
            .filter(|(key, _)| (filter.0)(key))
            .map(|(_, child)| child.count_matching(&filter.1))
            .sum()
    }

    fn profile(&self) -> Self::Profile {
        LayerProfile {
            entries: self
                .children
                .iter()
                .map(|(key, child)| (key.clone(), child.profile()))
                .collect(),
        }
    }

    fn presize(&mut self, profile: &Self::Profile) {
        self.children = profile
            .entries
            .iter()
            .map(|(key, sub)| {
                let mut child = C::default();
                child.presize(sub);
                (key.clone(), child)
            })
            .collect();
        self.size = 0;
    }

    fn cursor(&self) -> Self::Cursor<'_> {
        let mut cursor = LayerCursor {
            layer: self,
            pos: Position::PastBegin,
        };
        cursor.rewind();
        cursor
    }

    fn cursor_at_end(&self) -> Self::Cursor<'_> {
        let mut cursor = LayerCursor {
            layer: self,
            pos: Position::PastBegin,
        };
        cursor.fast_forward();
        cursor
    }

    fn cursor_mut(&mut self) -> Self::CursorMut<'_> {
        let mut cursor = LayerCursorMut {
            layer: NonNull::from(&mut *self),
            pos: Position::PastBegin,
            _marker: PhantomData,
        };
        cursor.rewind();
        cursor
    }

    fn cursor_mut_at_end(&mut self) -> Self::CursorMut<'_> {
        let mut cursor = LayerCursorMut {
            layer: NonNull::from(&mut *self),
            pos: Position::PastBegin,
            _marker: PhantomData,
        };
        cursor.fast_forward();
        cursor
    }

    fn range_cursor(&self, filter: Self::Filter) -> Self::RangeCursor<'_> {
        let mut cursor = LayerRangeCursor {
            layer: self,
            filter,
            begin_idx: 0,
            end_idx: 0,
            pos: Position::PastBegin,
        };
        cursor.rewind();
        cursor
    }

    fn range_cursor_at_end(&self, filter: Self::Filter) -> Self::RangeCursor<'_> {
        let mut cursor = LayerRangeCursor {
            layer: self,
            filter,
            begin_idx: 0,
            end_idx: 0,
            pos: Position::PastBegin,
        };
        cursor.fast_forward();
        cursor
    }
}

impl<K, C> TreePrint for Layer<K, C>
where
    K: Display,
    C: TreePrint,
{
    fn print(&self, out: &mut String, show_entries: bool) {
        out.push_str(&format!("size: {}\n", self.size));
        out.push_str(&format!("keys: {}\n", self.children.len()));
        for (idx, (key, child)) in self.children.iter().enumerate() {
            let (branch, continuation) = if idx + 1 == self.children.len() {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            out.push_str(&format!("{branch}{key}\n"));

            let mut rendered = String::new();
            child.print(&mut rendered, show_entries);
            out.push_str(&indent(&rendered, continuation));
        }
    }
}

impl<K, C> Display for Layer<K, C>
where
    K: Display,
    C: TreePrint,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut rendered = String::new();
        self.print(&mut rendered, true);
        f.write_str(&rendered)
    }
}

/// Read-only cursor over the payloads below a [`Layer`].
///
/// Holds the sibling index plus the nested cursor for the child at that
/// index; the nesting bottoms out in a leaf cursor.
pub struct LayerCursor<'s, K, C: Tree + 's> {
    layer: &'s Layer<K, C>,
    pos: Position<C::Cursor<'s>>,
}

impl<'s, K, C: Tree> Clone for LayerCursor<'s, K, C>
where
    C::Cursor<'s>: Clone,
{
    fn clone(&self) -> Self {
        Self {
            layer: self.layer,
            pos: self.pos.clone(),
        }
    }
}

impl<'s, K: Key, C: Tree> LayerCursor<'s, K, C> {
    /// First sibling at or after `from` holding any payload, with its child
    /// cursor at begin. Payload-empty children (possible in presized trees)
    /// are skipped.
    fn first_from(&self, from: usize) -> Option<(usize, C::Cursor<'s>)> {
        for idx in from..self.layer.children.len() {
            let sub = self.layer.children[idx].1.cursor();
            if !sub.is_end() {
                return Some((idx, sub));
            }
        }
        None
    }

    /// Last sibling at or before `from` holding any payload, with its child
    /// cursor at the last payload.
    fn last_down_from(&self, from: usize) -> Option<(usize, C::Cursor<'s>)> {
        for idx in (0..=from).rev() {
            let sub = self.layer.children[idx].1.cursor_at_end();
            if !sub.is_past_begin() {
                return Some((idx, sub));
            }
        }
        None
    }
}

impl<'s, K: Key, C: Tree> Cursor<'s> for LayerCursor<'s, K, C> {
    type Entry = C::Entry;
    type KeyPath = (&'s K, <C::Cursor<'s> as Cursor<'s>>::KeyPath);

    fn rewind(&mut self) {
        self.pos = match self.first_from(0) {
            Some((idx, sub)) => Position::At { idx, sub },
            None => Position::PastBegin,
        };
    }

    fn fast_forward(&mut self) {
        let len = self.layer.children.len();
        self.pos = if len == 0 {
            Position::PastBegin
        } else {
            match self.last_down_from(len - 1) {
                Some((idx, sub)) => Position::At { idx, sub },
                None => Position::PastBegin,
            }
        };
    }

    fn step(&mut self) {
        if matches!(self.pos, Position::PastBegin) {
            // The rewind step: stepping out of `PastBegin` lands back on
            // the position `rewind` produces.
            self.rewind();
            return;
        }

        let exhausted = match &mut self.pos {
            Position::At { idx, sub } => {
                sub.step();
                sub.is_end().then_some(*idx)
            }
            _ => None,
        };

        if let Some(idx) = exhausted {
            self.pos = match self.first_from(idx + 1) {
                Some((idx, sub)) => Position::At { idx, sub },
                None => Position::End,
            };
        }
    }

    fn step_reverse(&mut self) {
        if matches!(self.pos, Position::End) {
            self.fast_forward();
            return;
        }

        let exhausted = match &mut self.pos {
            Position::At { idx, sub } => {
                sub.step_reverse();
                sub.is_past_begin().then_some(*idx)
            }
            _ => None,
        };

        if let Some(idx) = exhausted {
            self.pos = if idx == 0 {
                Position::PastBegin
            } else {
                match self.last_down_from(idx - 1) {
                    Some((idx, sub)) => Position::At { idx, sub },
                    None => Position::PastBegin,
                }
            };
        }
    }

    fn is_begin(&self) -> bool {
        match &self.pos {
            Position::At { idx, sub } => {
                sub.is_begin()
                    && self.layer.children[..*idx]
                        .iter()
                        .all(|(_, child)| child.is_empty())
            }
            _ => false,
        }
    }

    fn is_past_begin(&self) -> bool {
        self.layer.size == 0 || matches!(self.pos, Position::PastBegin)
    }

    fn is_end(&self) -> bool {
        self.layer.size == 0 || matches!(self.pos, Position::End)
    }

    fn entry(&self) -> &'s C::Entry {
        match &self.pos {
            Position::At { sub, .. } => sub.entry(),
            _ => invalid_position(),
        }
    }

    fn keyed_entry(&self) -> (Self::KeyPath, &'s C::Entry) {
        match &self.pos {
            Position::At { idx, sub } => {
                let (path, entry) = sub.keyed_entry();
                ((&self.layer.children[*idx].0, path), entry)
            }
            _ => invalid_position(),
        }
    }
}

/// Mutable cursor over the payloads below a [`Layer`].
///
/// The cursor was created from an exclusive borrow of the tree, held for
/// `'s` through the marker. Sibling moves re-borrow a different child of the
/// same node, which a `&mut` chain cannot express, so the node is kept as a
/// raw pointer and child borrows are carved out of it one at a time:
/// `pos` holds at most one child cursor, and every probe either becomes that
/// cursor or is dropped before the next borrow is created.
pub struct LayerCursorMut<'s, K, C: Tree + 's> {
    layer: NonNull<Layer<K, C>>,
    pos: Position<C::CursorMut<'s>>,
    _marker: PhantomData<&'s mut Layer<K, C>>,
}

impl<'s, K: Key, C: Tree + 's> LayerCursorMut<'s, K, C> {
    fn num_children(&self) -> usize {
        // Safety: reads the vector header only; child payloads live in the
        // vector's heap buffer and are never aliased by this read.
        unsafe { (*self.layer.as_ptr()).children.len() }
    }

    fn total_size(&self) -> usize {
        // Safety: plain field read, no reference to the children is formed.
        unsafe { (*self.layer.as_ptr()).size }
    }

    fn pair_ptr(&self, idx: usize) -> *mut (K, C) {
        debug_assert!(idx < self.num_children());
        // Safety: `idx` is in bounds; only a raw pointer is produced here,
        // the callers decide which half of the pair they may borrow.
        unsafe { (*self.layer.as_ptr()).children.as_mut_ptr().add(idx) }
    }

    fn key_at(&self, idx: usize) -> &K {
        // Safety: borrows the key half of the pair only; a live child
        // cursor borrows the child half.
        unsafe { &(*self.pair_ptr(idx)).0 }
    }

    /// Child cursor at begin for the child at `idx`.
    ///
    /// Safety contract (private): the caller must not hold another borrow
    /// of the same child; `pos` may hold a cursor for a different sibling.
    fn child_begin(&self, idx: usize) -> C::CursorMut<'s> {
        let child: &'s mut C = unsafe { &mut (*self.pair_ptr(idx)).1 };
        child.cursor_mut()
    }

    /// Child cursor at the last payload for the child at `idx`; same
    /// contract as [`Self::child_begin`].
    fn child_end(&self, idx: usize) -> C::CursorMut<'s> {
        let child: &'s mut C = unsafe { &mut (*self.pair_ptr(idx)).1 };
        child.cursor_mut_at_end()
    }

    fn child_is_empty(&self, idx: usize) -> bool {
        // Safety: shared borrow of a child that no cursor borrows; callers
        // only ask about siblings outside the current position.
        unsafe { (*self.pair_ptr(idx)).1.is_empty() }
    }

    fn first_from(&self, from: usize) -> Option<(usize, C::CursorMut<'s>)> {
        for idx in from..self.num_children() {
            let sub = self.child_begin(idx);
            if !sub.is_end() {
                return Some((idx, sub));
            }
        }
        None
    }

    fn last_down_from(&self, from: usize) -> Option<(usize, C::CursorMut<'s>)> {
        for idx in (0..=from).rev() {
            let sub = self.child_end(idx);
            if !sub.is_past_begin() {
                return Some((idx, sub));
            }
        }
        None
    }
}

impl<'s, K: Key, C: Tree + 's> CursorMut<'s> for LayerCursorMut<'s, K, C> {
    type Entry = C::Entry;
    type KeyPath<'a>
        = (&'a K, <C::CursorMut<'s> as CursorMut<'s>>::KeyPath<'a>)
    where
        Self: 'a;

    fn rewind(&mut self) {
        // Drop the held child cursor before probing: the probe may borrow
        // the same child again.
        self.pos = Position::PastBegin;
        self.pos = match self.first_from(0) {
            Some((idx, sub)) => Position::At { idx, sub },
            None => Position::PastBegin,
        };
    }

    fn fast_forward(&mut self) {
        self.pos = Position::PastBegin;
        let len = self.num_children();
        self.pos = if len == 0 {
            Position::PastBegin
        } else {
            match self.last_down_from(len - 1) {
                Some((idx, sub)) => Position::At { idx, sub },
                None => Position::PastBegin,
            }
        };
    }

    fn step(&mut self) {
        if matches!(self.pos, Position::PastBegin) {
            self.rewind();
            return;
        }

        let exhausted = match &mut self.pos {
            Position::At { idx, sub } => {
                sub.step();
                sub.is_end().then_some(*idx)
            }
            _ => None,
        };

        if let Some(idx) = exhausted {
            self.pos = Position::End;
            if let Some((idx, sub)) = self.first_from(idx + 1) {
                self.pos = Position::At { idx, sub };
            }
        }
    }

    fn step_reverse(&mut self) {
        if matches!(self.pos, Position::End) {
            self.fast_forward();
            return;
        }

        let exhausted = match &mut self.pos {
            Position::At { idx, sub } => {
                sub.step_reverse();
                sub.is_past_begin().then_some(*idx)
            }
            _ => None,
        };

        if let Some(idx) = exhausted {
            self.pos = Position::PastBegin;
            if idx > 0 {
                if let Some((idx, sub)) = self.last_down_from(idx - 1) {
                    self.pos = Position::At { idx, sub };
                }
            }
        }
    }

    fn is_begin(&self) -> bool {
        match &self.pos {
            Position::At { idx, sub } => {
                sub.is_begin() && (0..*idx).all(|before| self.child_is_empty(before))
            }
            _ => false,
        }
    }

    fn is_past_begin(&self) -> bool {
        self.total_size() == 0 || matches!(self.pos, Position::PastBegin)
    }

    fn is_end(&self) -> bool {
        self.total_size() == 0 || matches!(self.pos, Position::End)
    }

    fn entry(&self) -> &C::Entry {
        match &self.pos {
            Position::At { sub, .. } => sub.entry(),
            _ => invalid_position(),
        }
    }

    fn entry_mut(&mut self) -> &mut C::Entry {
        match &mut self.pos {
            Position::At { sub, .. } => sub.entry_mut(),
            _ => invalid_position(),
        }
    }

    fn keyed_entry(&self) -> (Self::KeyPath<'_>, &C::Entry) {
        match &self.pos {
            Position::At { idx, sub } => {
                let (path, entry) = sub.keyed_entry();
                ((self.key_at(*idx), path), entry)
            }
            _ => invalid_position(),
        }
    }
}

/// Filtered cursor over the payloads below a [`Layer`].
///
/// `filter.0` applies to this level's keys, `filter.1` travels down to the
/// child cursors. `[begin_idx, end_idx)` is the window of sibling indices
/// that can lead to a visible payload, discovered by a forward and a
/// backward probe when the cursor is (re)positioned and reused by every
/// step; matching siblings inside the window may still be scattered, so
/// each sibling move re-checks the predicate.
pub struct LayerRangeCursor<'s, K, C: Tree + 's> {
    layer: &'s Layer<K, C>,
    filter: (KeyPredicate<K>, C::Filter),
    begin_idx: usize,
    end_idx: usize,
    pos: Position<C::RangeCursor<'s>>,
}

impl<'s, K: Key, C: Tree> LayerRangeCursor<'s, K, C> {
    /// First sibling in `from..upto` that passes the predicate and leads to
    /// a visible payload, with its child cursor on that payload.
    fn probe_forward(&self, from: usize, upto: usize) -> Option<(usize, C::RangeCursor<'s>)> {
        for idx in from..upto {
            let (key, child) = &self.layer.children[idx];
            if (self.filter.0)(key) {
                let sub = child.range_cursor(self.filter.1.clone());
                if !sub.is_end() {
                    return Some((idx, sub));
                }
            }
        }
        None
    }

    /// Last sibling in `downto..=from` that passes the predicate and leads
    /// to a visible payload, with its child cursor on its last one.
    fn probe_backward(&self, from: usize, downto: usize) -> Option<(usize, C::RangeCursor<'s>)> {
        for idx in (downto..=from).rev() {
            let (key, child) = &self.layer.children[idx];
            if (self.filter.0)(key) {
                let sub = child.range_cursor_at_end(self.filter.1.clone());
                if !sub.is_past_begin() {
                    return Some((idx, sub));
                }
            }
        }
        None
    }

    fn window_is_empty(&self) -> bool {
        self.begin_idx == self.end_idx
    }

    fn park_nowhere(&mut self) {
        self.begin_idx = 0;
        self.end_idx = 0;
        self.pos = Position::PastBegin;
    }
}

impl<'s, K: Key, C: Tree> RangeCursor<'s> for LayerRangeCursor<'s, K, C> {
    type Entry = C::Entry;
    type KeyPath = (&'s K, <C::RangeCursor<'s> as RangeCursor<'s>>::KeyPath);

    fn rewind(&mut self) -> bool {
        let len = self.layer.children.len();
        if len == 0 {
            self.park_nowhere();
            return false;
        }

        match self.probe_forward(0, len) {
            None => {
                self.park_nowhere();
                false
            }
            Some((idx, sub)) => {
                self.begin_idx = idx;
                self.end_idx = match self.probe_backward(len - 1, idx) {
                    Some((last, _)) => last + 1,
                    // Unreachable: the forward probe found a match at `idx`.
                    None => idx + 1,
                };
                self.pos = Position::At { idx, sub };
                true
            }
        }
    }

    fn fast_forward(&mut self) -> bool {
        let len = self.layer.children.len();
        if len == 0 {
            self.park_nowhere();
            return false;
        }

        match self.probe_backward(len - 1, 0) {
            None => {
                self.park_nowhere();
                false
            }
            Some((idx, sub)) => {
                self.end_idx = idx + 1;
                self.begin_idx = match self.probe_forward(0, idx + 1) {
                    Some((first, _)) => first,
                    None => idx,
                };
                self.pos = Position::At { idx, sub };
                true
            }
        }
    }

    fn step(&mut self) {
        if matches!(self.pos, Position::PastBegin) {
            self.rewind();
            return;
        }

        let exhausted = match &mut self.pos {
            Position::At { idx, sub } => {
                sub.step();
                sub.is_end().then_some(*idx)
            }
            _ => None,
        };

        if let Some(idx) = exhausted {
            self.pos = match self.probe_forward(idx + 1, self.end_idx) {
                Some((idx, sub)) => Position::At { idx, sub },
                None => Position::End,
            };
        }
    }

    fn step_reverse(&mut self) {
        if matches!(self.pos, Position::End) {
            self.fast_forward();
            return;
        }

        let exhausted = match &mut self.pos {
            Position::At { idx, sub } => {
                sub.step_reverse();
                sub.is_past_begin().then_some(*idx)
            }
            _ => None,
        };

        if let Some(idx) = exhausted {
            self.pos = if idx <= self.begin_idx {
                Position::PastBegin
            } else {
                match self.probe_backward(idx - 1, self.begin_idx) {
                    Some((idx, sub)) => Position::At { idx, sub },
                    None => Position::PastBegin,
                }
            };
        }
    }

    fn is_begin(&self) -> bool {
        match &self.pos {
            Position::At { idx, sub } => *idx == self.begin_idx && sub.is_begin(),
            _ => false,
        }
    }

    fn is_past_begin(&self) -> bool {
        self.window_is_empty() || matches!(self.pos, Position::PastBegin)
    }

    fn is_end(&self) -> bool {
        self.window_is_empty() || matches!(self.pos, Position::End)
    }

    fn entry(&self) -> &'s C::Entry {
        match &self.pos {
            Position::At { sub, .. } => sub.entry(),
            _ => invalid_position(),
        }
    }

    fn keyed_entry(&self) -> (Self::KeyPath, &'s C::Entry) {
        match &self.pos {
            Position::At { idx, sub } => {
                let (path, entry) = sub.keyed_entry();
                ((&self.layer.children[*idx].0, path), entry)
            }
            _ => invalid_position(),
        }
    }

    fn count(&self) -> usize {
        self.layer.count_matching(&self.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::Layer;
    use crate::filter::{any_key, key_equals};
    use crate::tree::{Cursor, CursorMut, Entry, Leaf, RangeCursor, Tree, TreePrint};

    type Two = Layer<i32, Layer<i32, Leaf<i32, u64>>>;

    fn item(k1: i32, k2: i32, data: i32) -> (i32, (i32, Entry<i32, u64>)) {
        (k1, (k2, Entry::new(data, 1)))
    }

    #[test]
    fn add_maintains_sorted_keys_and_size() {
        let mut tree = Two::default();
        assert!(tree.add(item(2, 1, 10)));
        assert!(tree.add(item(1, 5, 20)));
        assert!(tree.add(item(1, 3, 30)));
        assert!(!tree.add(item(1, 3, 30)));

        assert_eq!(tree.size(), 3);
        assert_eq!(tree.num_keys(), 2);
        assert_eq!(tree.key(0), &1);
        assert_eq!(tree.key(1), &2);
        assert_eq!(tree.sizes(), vec![2, 1]);
        assert_eq!(tree.child(0).key(0), &3);
        assert_eq!(tree.child(0).key(1), &5);
    }

    #[test]
    fn merge_transplants_missing_keys() {
        let mut left = Two::default();
        left.add(item(1, 1, 1));
        left.add(item(1, 1, 2));

        let mut right = Two::default();
        right.add(item(1, 1, 2));
        right.add(item(2, 7, 3));
        right.add(item(2, 7, 4));

        let added = left.merge(right);
        assert_eq!(added, 2);
        assert_eq!(left.size(), 4);
        assert_eq!(left.sizes(), vec![2, 2]);
        // The duplicate (1, 1, 2) merged its metadata.
        assert_eq!(left.child(0).child(0).find(&2).map(|e| e.meta), Some(2));

        let mut recomputed = left.clone();
        assert_eq!(recomputed.recompute_size(), left.size());
    }

    #[test]
    fn merge_all_keeps_duplicates() {
        let mut left = Two::default();
        left.add_all(item(1, 1, 1));

        let mut right = Two::default();
        right.add_all(item(1, 1, 1));
        right.add_all(item(1, 1, 1));

        assert_eq!(left.merge_all(right), 2);
        assert_eq!(left.size(), 3);
    }

    #[test]
    fn cursor_visits_payloads_in_key_order() {
        let mut tree = Two::default();
        for (k1, k2, data) in [(2, 2, 40), (1, 2, 20), (1, 1, 10), (1, 2, 30)] {
            tree.add(item(k1, k2, data));
        }

        let mut cursor = tree.cursor();
        let mut seen = Vec::new();
        while !cursor.is_end() {
            let ((k1, (k2, ())), entry) = cursor.keyed_entry();
            seen.push((*k1, *k2, entry.data));
            cursor.step();
        }
        assert_eq!(seen, vec![(1, 1, 10), (1, 2, 20), (1, 2, 30), (2, 2, 40)]);
    }

    #[test]
    fn cursor_mut_touches_every_payload() {
        let mut tree = Two::default();
        for (k1, k2, data) in [(1, 1, 1), (1, 2, 2), (3, 1, 3)] {
            tree.add(item(k1, k2, data));
        }

        let mut cursor = tree.cursor_mut();
        while !cursor.is_end() {
            cursor.entry_mut().meta += 10;
            cursor.step();
        }
        drop(cursor);

        let mut cursor = tree.cursor();
        while !cursor.is_end() {
            assert_eq!(cursor.entry().meta, 11);
            cursor.step();
        }
    }

    #[test]
    fn cursor_mut_walks_backward() {
        let mut tree = Two::default();
        for (k1, k2, data) in [(1, 1, 1), (2, 1, 2), (2, 2, 3)] {
            tree.add(item(k1, k2, data));
        }

        let mut cursor = tree.cursor_mut_at_end();
        let mut seen = Vec::new();
        while !cursor.is_past_begin() {
            seen.push(cursor.entry().data);
            cursor.step_reverse();
        }
        assert_eq!(seen, vec![3, 2, 1]);
    }

    #[test]
    fn range_cursor_restricts_by_level() {
        let mut tree = Two::default();
        for (k1, k2, data) in [(1, 1, 1), (1, 2, 2), (2, 1, 3), (3, 2, 4)] {
            tree.add(item(k1, k2, data));
        }

        let filter = (key_equals(1), (any_key(), ()));
        let mut cursor = tree.range_cursor(filter.clone());
        assert_eq!(cursor.count(), 2);

        let mut seen = Vec::new();
        while !cursor.is_end() {
            seen.push(cursor.entry().data);
            cursor.step();
        }
        assert_eq!(seen, vec![1, 2]);

        assert_eq!(tree.count_matching(&filter), 2);
    }

    #[test]
    fn range_cursor_with_no_match_is_nowhere() {
        let mut tree = Two::default();
        tree.add(item(1, 1, 1));

        let cursor = tree.range_cursor((key_equals(9), (any_key(), ())));
        assert!(cursor.is_past_begin());
        assert!(cursor.is_end());
        assert_eq!(cursor.count(), 0);
    }

    #[test]
    fn print_renders_nested_structure() {
        let mut tree = Layer::<i32, Leaf<i32, u64>>::default();
        tree.add((1, Entry::new(7, 1)));
        tree.add((1, Entry::new(8, 1)));
        tree.add((2, Entry::new(9, 1)));

        let mut out = String::new();
        tree.print(&mut out, true);
        let expected = "size: 3\n\
                        keys: 2\n\
                        ├── 1\n\
                        │   size: 2\n\
                        │   ├── 7 {1}\n\
                        │   └── 8 {1}\n\
                        └── 2\n\
                        \u{20}   size: 1\n\
                        \u{20}   └── 9 {1}\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn presized_tree_has_shape_but_no_payloads() {
        let mut tree = Two::default();
        tree.add(item(1, 1, 1));
        tree.add(item(2, 5, 2));

        let profile = tree.profile();
        let mut fresh = Two::default();
        fresh.presize(&profile);

        assert_eq!(fresh.size(), 0);
        assert_eq!(fresh.num_keys(), 2);
        assert_eq!(fresh.child(1).key(0), &5);

        let cursor = fresh.cursor();
        assert!(cursor.is_past_begin());
        assert!(cursor.is_end());
    }
}
