//! Lower-bound search over key-sorted slices.
//!
//! Nodes keep their children sorted by key, so locating a key is a
//! lower-bound search: the returned index is where the key lives if present,
//! and where it must be inserted to keep the slice sorted otherwise. Short
//! slices are scanned linearly; a contiguous scan beats the branchy binary
//! search up to a few dozen elements. The crossover is a policy parameter
//! (`LINEAR_LIMIT`), not a constant; `benches/search.rs` is the tool for
//! re-tuning it on a new target.

/// Default crossover length between the linear and the binary search.
pub const DEFAULT_LINEAR_LIMIT: usize = 32;

/// Locates `target` in a slice sorted ascending by `key_of`.
///
/// Returns `(index, found)`: the position of `target` when `found` is true,
/// otherwise the position at which `target` should be inserted to preserve
/// the order. With duplicate keys the index of the first match is returned.
#[inline]
pub fn search<T, K, F>(items: &[T], target: &K, key_of: F) -> (usize, bool)
where
    K: Ord,
    F: Fn(&T) -> &K,
{
    search_with::<DEFAULT_LINEAR_LIMIT, T, K, F>(items, target, key_of)
}

/// [`search`] with an explicit linear/binary crossover length.
#[inline]
pub fn search_with<const LINEAR_LIMIT: usize, T, K, F>(
    items: &[T],
    target: &K,
    key_of: F,
) -> (usize, bool)
where
    K: Ord,
    F: Fn(&T) -> &K,
{
    if items.len() <= LINEAR_LIMIT {
        linear_search(items, target, key_of)
    } else {
        binary_search(items, target, key_of)
    }
}

/// Lower-bound scan from the front.
///
/// Must agree with [`binary_search`] on every input; the property suite
/// below checks the two against each other.
pub fn linear_search<T, K, F>(items: &[T], target: &K, key_of: F) -> (usize, bool)
where
    K: Ord,
    F: Fn(&T) -> &K,
{
    for (index, item) in items.iter().enumerate() {
        let key = key_of(item);
        if key >= target {
            return (index, key == target);
        }
    }
    (items.len(), false)
}

/// Classic lower-bound bisection.
pub fn binary_search<T, K, F>(items: &[T], target: &K, key_of: F) -> (usize, bool)
where
    K: Ord,
    F: Fn(&T) -> &K,
{
    let mut lo = 0;
    let mut hi = items.len();

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if key_of(&items[mid]) < target {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }

    (lo, lo < items.len() && key_of(&items[lo]) == target)
}

#[cfg(test)]
mod tests {
    use super::{binary_search, linear_search, search, search_with};
    use proptest::{collection::vec, prelude::*};

    fn id(x: &i32) -> &i32 {
        x
    }

    #[test]
    fn empty_slice() {
        for target in 1..=9 {
            assert_eq!(search(&[], &target, id), (0, false));
        }
    }

    #[test]
    fn singleton() {
        let items = [5];
        for target in 1..5 {
            assert_eq!(search(&items, &target, id), (0, false));
        }
        assert_eq!(search(&items, &5, id), (0, true));
        for target in 6..=9 {
            assert_eq!(search(&items, &target, id), (1, false));
        }
    }

    #[test]
    fn odd_keys() {
        // Both below and above the default crossover.
        for upper in [9, 301] {
            let items: Vec<i32> = (1..=upper).step_by(2).collect();

            for target in (1..=upper).step_by(2) {
                assert_eq!(search(&items, &target, id), ((target as usize - 1) / 2, true));
            }
            for target in (0..=upper + 1).step_by(2) {
                assert_eq!(search(&items, &target, id), (target as usize / 2, false));
            }
        }
    }

    #[test]
    fn searches_pairs_by_key() {
        let items = [(1, 'a'), (4, 'b'), (9, 'c')];
        assert_eq!(search(&items, &4, |(k, _)| k), (1, true));
        assert_eq!(search(&items, &5, |(k, _)| k), (2, false));
    }

    #[test]
    fn first_of_duplicates() {
        let items = [1, 3, 3, 3, 7];
        assert_eq!(linear_search(&items, &3, id), (1, true));
        assert_eq!(binary_search(&items, &3, id), (1, true));
    }

    fn sorted(len: usize) -> impl Strategy<Value = Vec<i32>> {
        vec(any::<i32>(), 0..len).prop_map(|mut v| {
            v.sort_unstable();
            v
        })
    }

    proptest! {
        #[test]
        fn linear_binary_agree(target in any::<i32>(), items in sorted(200)) {
            prop_assert_eq!(
                linear_search(&items, &target, id),
                binary_search(&items, &target, id)
            );
        }

        #[test]
        fn crossover_is_transparent(target in any::<i32>(), items in sorted(200)) {
            prop_assert_eq!(
                search_with::<0, _, _, _>(&items, &target, id),
                search_with::<{ usize::MAX }, _, _, _>(&items, &target, id)
            );
        }

        #[test]
        fn lower_bound_contract(target in any::<i32>(), items in sorted(200)) {
            let (index, found) = search(&items, &target, id);
            let expected = items.partition_point(|&x| x < target);

            prop_assert_eq!(index, expected);
            prop_assert_eq!(found, items.get(index) == Some(&target));
        }

        #[test]
        fn insertion_preserves_order(target in any::<i32>(), items in sorted(64)) {
            let (index, _) = search(&items, &target, id);
            let mut inserted = items.clone();
            inserted.insert(index, target);

            prop_assert!(inserted.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
