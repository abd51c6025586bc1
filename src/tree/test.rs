//! Behavioral tests for the tree, checked against nested-map reference
//! models.

use crate::filter::{any_key, key_equals, key_in, key_matches};
use crate::tree::{Cursor, CursorMut, Entry, RangeCursor, Tree};
use crate::{Depth3, Layer, Leaf};
use proptest::{collection::vec, prelude::*};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

// Unordered insertion tuples `(k1, k2, k3, data)` used as test inputs.
type Tuples3 = Vec<(i32, i32, i32, i32)>;

// An equivalent representation of a depth-3 tree as nested maps; the
// innermost map carries the occurrence count per distinct data value.
type Model3 = BTreeMap<i32, BTreeMap<i32, BTreeMap<i32, BTreeMap<i32, u64>>>>;

type Tree3 = Depth3<i32, i32, i32, i32, u64>;
type Filter3 = <Tree3 as Tree>::Filter;

fn tuples3(max_key: i32, max_data: i32, max_len: usize) -> BoxedStrategy<Tuples3> {
    vec(
        (0..max_key, 0..max_key, 0..max_key, 0..max_data),
        0..max_len,
    )
    .boxed()
}

fn item3((k1, k2, k3, data): (i32, i32, i32, i32)) -> <Tree3 as Tree>::Item {
    (k1, (k2, (k3, Entry::new(data, 1))))
}

fn tree3(tuples: &Tuples3) -> Tree3 {
    let mut tree = Tree3::default();
    for &tuple in tuples {
        tree.add(item3(tuple));
    }
    tree
}

fn model3(tuples: &Tuples3) -> Model3 {
    let mut model = Model3::new();
    for &(k1, k2, k3, data) in tuples {
        *model
            .entry(k1)
            .or_default()
            .entry(k2)
            .or_default()
            .entry(k3)
            .or_default()
            .entry(data)
            .or_insert(0) += 1;
    }
    model
}

// Flattens the model into depth-first, key-ascending visit order.
fn flatten3(model: &Model3) -> Vec<(i32, i32, i32, i32, u64)> {
    let mut flat = Vec::new();
    for (&k1, sub1) in model {
        for (&k2, sub2) in sub1 {
            for (&k3, leaf) in sub2 {
                for (&data, &count) in leaf {
                    flat.push((k1, k2, k3, data, count));
                }
            }
        }
    }
    flat
}

fn collect_forward(tree: &Tree3) -> Vec<(i32, i32, i32, i32, u64)> {
    let mut cursor = tree.cursor();
    let mut seen = Vec::new();
    while !cursor.is_end() {
        let ((k1, (k2, (k3, ()))), entry) = cursor.keyed_entry();
        seen.push((*k1, *k2, *k3, entry.data, entry.meta));
        cursor.step();
    }
    seen
}

fn collect_backward(tree: &Tree3) -> Vec<(i32, i32, i32, i32, u64)> {
    let mut cursor = tree.cursor_at_end();
    let mut seen = Vec::new();
    while !cursor.is_past_begin() {
        let ((k1, (k2, (k3, ()))), entry) = cursor.keyed_entry();
        seen.push((*k1, *k2, *k3, entry.data, entry.meta));
        cursor.step_reverse();
    }
    seen
}

// m forward steps from begin reach end, m backward steps return to begin,
// one more lands past begin, and one forward step restores begin.
fn check_rewind_symmetry(tree: &Tree3) {
    let payloads = tree.size();
    let mut cursor = tree.cursor();

    for _ in 0..payloads {
        assert!(!cursor.is_end());
        cursor.step();
    }
    assert!(cursor.is_end());

    for _ in 0..payloads {
        cursor.step_reverse();
    }
    if payloads > 0 {
        assert!(cursor.is_begin());
        assert!(!cursor.is_past_begin());
    }

    cursor.step_reverse();
    assert!(cursor.is_past_begin());

    cursor.step();
    if payloads > 0 {
        assert!(cursor.is_begin());
    }
}

fn range_filter(ranges: &[RangeInclusive<i32>; 3]) -> Filter3 {
    (
        key_in(ranges[0].clone()),
        (key_in(ranges[1].clone()), (key_in(ranges[2].clone()), ())),
    )
}

fn flatten3_filtered(
    model: &Model3,
    ranges: &[RangeInclusive<i32>; 3],
) -> Vec<(i32, i32, i32, i32, u64)> {
    flatten3(model)
        .into_iter()
        .filter(|(k1, k2, k3, _, _)| {
            ranges[0].contains(k1) && ranges[1].contains(k2) && ranges[2].contains(k3)
        })
        .collect()
}

fn collect_range_forward(tree: &Tree3, filter: Filter3) -> Vec<(i32, i32, i32, i32, u64)> {
    let mut cursor = tree.range_cursor(filter);
    let mut seen = Vec::new();
    while !cursor.is_end() {
        let ((k1, (k2, (k3, ()))), entry) = cursor.keyed_entry();
        seen.push((*k1, *k2, *k3, entry.data, entry.meta));
        cursor.step();
    }
    seen
}

fn collect_range_backward(tree: &Tree3, filter: Filter3) -> Vec<(i32, i32, i32, i32, u64)> {
    let mut cursor = tree.range_cursor_at_end(filter);
    let mut seen = Vec::new();
    while !cursor.is_past_begin() {
        let ((k1, (k2, (k3, ()))), entry) = cursor.keyed_entry();
        seen.push((*k1, *k2, *k3, entry.data, entry.meta));
        cursor.step_reverse();
    }
    seen
}

proptest! {
    #[test]
    fn unique_insertion_matches_model(tuples in tuples3(6, 8, 200)) {
        let tree = tree3(&tuples);
        let model = model3(&tuples);

        let distinct: usize = model
            .values()
            .flat_map(|s1| s1.values())
            .flat_map(|s2| s2.values())
            .map(|leaf| leaf.len())
            .sum();
        prop_assert_eq!(tree.size(), distinct);

        let mut recomputed = tree.clone();
        prop_assert_eq!(recomputed.recompute_size(), tree.size());

        prop_assert_eq!(collect_forward(&tree), flatten3(&model));
    }

    #[test]
    fn backward_iteration_reverses_forward(tuples in tuples3(5, 6, 120)) {
        let tree = tree3(&tuples);

        let mut forward = collect_forward(&tree);
        forward.reverse();
        prop_assert_eq!(collect_backward(&tree), forward);
    }

    #[test]
    fn rewind_symmetry(tuples in tuples3(4, 5, 80)) {
        check_rewind_symmetry(&tree3(&tuples));
    }

    #[test]
    fn store_all_keeps_every_payload(tuples in tuples3(4, 4, 120)) {
        let mut tree = Tree3::default();
        for &tuple in &tuples {
            tree.add_all(item3(tuple));
        }

        prop_assert_eq!(tree.size(), tuples.len());

        let mut recomputed = tree.clone();
        prop_assert_eq!(recomputed.recompute_size(), tuples.len());

        // Every stored payload keeps its own unit metadata; the visit
        // sequence repeats each distinct payload once per insertion.
        let expected: Vec<_> = flatten3(&model3(&tuples))
            .into_iter()
            .flat_map(|(k1, k2, k3, data, count)| {
                std::iter::repeat((k1, k2, k3, data, 1)).take(count as usize)
            })
            .collect();
        prop_assert_eq!(collect_forward(&tree), expected);
    }

    #[test]
    fn merge_is_union(left in tuples3(5, 6, 100), right in tuples3(5, 6, 100)) {
        let mut merged = tree3(&left);
        let before = merged.size();
        let added = merged.merge(tree3(&right));

        let mut union = left.clone();
        union.extend(right.iter().copied());
        let model = model3(&union);

        prop_assert_eq!(merged.size(), before + added);
        prop_assert_eq!(collect_forward(&merged), flatten3(&model));

        let mut recomputed = merged.clone();
        prop_assert_eq!(recomputed.recompute_size(), merged.size());
    }

    #[test]
    fn merge_all_is_concatenation(left in tuples3(4, 4, 80), right in tuples3(4, 4, 80)) {
        let mut merged = Tree3::default();
        for &tuple in &left {
            merged.add_all(item3(tuple));
        }
        let mut other = Tree3::default();
        for &tuple in &right {
            other.add_all(item3(tuple));
        }

        let added = merged.merge_all(other);
        prop_assert_eq!(added, right.len());
        prop_assert_eq!(merged.size(), left.len() + right.len());
    }

    #[test]
    fn range_cursor_agrees_with_count(
        tuples in tuples3(6, 6, 150),
        lo1 in 0..6i32, hi1 in 0..6i32,
        lo2 in 0..6i32, hi2 in 0..6i32,
        lo3 in 0..6i32, hi3 in 0..6i32,
    ) {
        let tree = tree3(&tuples);
        let model = model3(&tuples);
        let ranges = [lo1..=hi1, lo2..=hi2, lo3..=hi3];

        let expected = flatten3_filtered(&model, &ranges);

        let cursor = tree.range_cursor(range_filter(&ranges));
        prop_assert_eq!(cursor.count(), expected.len());
        prop_assert_eq!(tree.count_matching(&range_filter(&ranges)), expected.len());

        prop_assert_eq!(collect_range_forward(&tree, range_filter(&ranges)), expected.clone());

        let mut reversed = expected;
        reversed.reverse();
        prop_assert_eq!(collect_range_backward(&tree, range_filter(&ranges)), reversed);
    }

    #[test]
    fn cursor_mut_visits_every_payload(tuples in tuples3(4, 5, 80)) {
        let mut tree = tree3(&tuples);
        let expected = collect_forward(&tree);

        let mut visited = 0usize;
        let mut cursor = tree.cursor_mut();
        while !cursor.is_end() {
            cursor.entry_mut().meta += 100;
            visited += 1;
            cursor.step();
        }
        drop(cursor);

        prop_assert_eq!(visited, tree.size());
        let bumped: Vec<_> = expected
            .into_iter()
            .map(|(k1, k2, k3, data, meta)| (k1, k2, k3, data, meta + 100))
            .collect();
        prop_assert_eq!(collect_forward(&tree), bumped);
    }
}

#[test]
fn empty_tree_rewind_symmetry() {
    let tree = Tree3::default();
    check_rewind_symmetry(&tree);

    let cursor = tree.cursor();
    assert!(cursor.is_past_begin());
    assert!(cursor.is_end());

    let cursor = tree.cursor_at_end();
    assert!(cursor.is_past_begin());
    assert!(cursor.is_end());
}

#[test]
fn stepping_at_sentinels_is_a_no_op() {
    let mut tree = Tree3::default();
    tree.add(item3((1, 1, 1, 10)));

    let mut cursor = tree.cursor();
    cursor.step();
    assert!(cursor.is_end());
    cursor.step();
    assert!(cursor.is_end());

    cursor.step_reverse();
    assert!(cursor.is_begin());
    cursor.step_reverse();
    assert!(cursor.is_past_begin());
    cursor.step_reverse();
    assert!(cursor.is_past_begin());
    cursor.step();
    assert!(cursor.is_begin());
}

// The concrete classification scenario: duplicate payloads merge their
// occurrence counters, distinct payloads coexist under one key chain, and
// disjoint key chains split the top level.
#[test]
fn three_level_scenario() {
    let mut tree = Depth3::<i32, i32, i32, String, u64>::default();
    tree.add((1, (1, (1, Entry::new("A".to_owned(), 1)))));
    tree.add((1, (1, (1, Entry::new("A".to_owned(), 1)))));
    tree.add((1, (1, (1, Entry::new("B".to_owned(), 1)))));
    tree.add((2, (2, (2, Entry::new("C".to_owned(), 1)))));

    assert_eq!(tree.size(), 3);
    assert_eq!(tree.num_keys(), 2);
    assert_eq!(tree.key(0), &1);
    assert_eq!(tree.key(1), &2);
    assert_eq!(tree.sizes(), vec![2, 1]);

    let mut cursor = tree.cursor();
    let mut seen = Vec::new();
    while !cursor.is_end() {
        let entry = cursor.entry();
        seen.push((entry.data.clone(), entry.meta));
        cursor.step();
    }
    assert_eq!(
        seen,
        vec![
            ("A".to_owned(), 2),
            ("B".to_owned(), 1),
            ("C".to_owned(), 1)
        ]
    );
}

#[test]
fn three_level_scenario_ranges() {
    let mut tree = Depth3::<i32, i32, i32, String, u64>::default();
    tree.add((1, (1, (1, Entry::new("A".to_owned(), 1)))));
    tree.add((1, (1, (1, Entry::new("A".to_owned(), 1)))));
    tree.add((1, (1, (1, Entry::new("B".to_owned(), 1)))));
    tree.add((2, (2, (2, Entry::new("C".to_owned(), 1)))));

    let first_only = (key_equals(1), (any_key(), (any_key(), ())));
    let cursor = tree.range_cursor(first_only.clone());
    assert_eq!(cursor.count(), 2);

    let mut cursor = tree.range_cursor(first_only);
    let mut seen = Vec::new();
    while !cursor.is_end() {
        seen.push(cursor.entry().data.clone());
        cursor.step();
    }
    assert_eq!(seen, vec!["A".to_owned(), "B".to_owned()]);

    let nothing = (key_equals(9), (any_key(), (any_key(), ())));
    let cursor = tree.range_cursor(nothing);
    assert_eq!(cursor.count(), 0);
    assert!(cursor.is_past_begin());
    assert!(cursor.is_end());
}

#[test]
fn range_cursor_skips_scattered_non_matches() {
    // Even keys at the top level, all of the second level: matches are not
    // contiguous siblings.
    let mut tree = Depth3::<i32, i32, i32, i32, u64>::default();
    for k1 in 0..6 {
        tree.add((k1, (0, (0, Entry::new(k1 * 10, 1)))));
    }

    let evens = (
        key_matches(|k: &i32| k % 2 == 0),
        (any_key(), (any_key(), ())),
    );
    let mut cursor = tree.range_cursor(evens.clone());
    assert_eq!(cursor.count(), 3);

    let mut seen = Vec::new();
    while !cursor.is_end() {
        seen.push(cursor.entry().data);
        cursor.step();
    }
    assert_eq!(seen, vec![0, 20, 40]);

    let mut cursor = tree.range_cursor_at_end(evens);
    let mut seen = Vec::new();
    while !cursor.is_past_begin() {
        seen.push(cursor.entry().data);
        cursor.step_reverse();
    }
    assert_eq!(seen, vec![40, 20, 0]);
}

#[test]
fn range_cursor_rewind_reports_matches() {
    let mut tree = Depth3::<i32, i32, i32, i32, u64>::default();
    tree.add((1, (1, (1, Entry::new(1, 1)))));

    let mut cursor = tree.range_cursor((any_key(), (any_key(), (any_key(), ()))));
    assert!(cursor.rewind());
    assert!(cursor.fast_forward());

    let mut cursor = tree.range_cursor((key_equals(2), (any_key(), (any_key(), ()))));
    assert!(!cursor.rewind());
    assert!(!cursor.fast_forward());
}

#[test]
fn depth_one_and_zero_trees() {
    let mut leaf = Leaf::<i32, u64>::default();
    leaf.add(Entry::new(3, 1));
    leaf.add(Entry::new(3, 1));
    assert_eq!(leaf.size(), 1);
    assert_eq!(leaf.find(&3).map(|e| e.meta), Some(2));

    let mut tree = Layer::<i32, Leaf<i32, u64>>::default();
    tree.add((5, Entry::new(3, 1)));
    tree.add((5, Entry::new(4, 1)));
    tree.add((7, Entry::new(3, 1)));
    assert_eq!(tree.size(), 3);
    assert_eq!(tree.num_keys(), 2);
    assert_eq!(tree.sizes(), vec![2, 1]);
}

#[test]
fn clear_resets_subtree() {
    let mut tree = tree3(&vec![(1, 1, 1, 1), (2, 2, 2, 2)]);
    assert_eq!(tree.size(), 2);

    tree.clear();
    assert_eq!(tree.size(), 0);
    assert_eq!(tree.num_keys(), 0);
    assert!(tree.cursor().is_end());
}

#[test]
fn num_bytes_grows_with_content() {
    let empty = Tree3::default();
    let tuples: Tuples3 = (0..50).map(|i| (i % 3, i % 5, i % 7, i)).collect();
    let populated = tree3(&tuples);

    assert!(populated.num_bytes() > empty.num_bytes());
}
