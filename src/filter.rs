//! Per-level key predicates for range cursors.
//!
//! A range cursor carries one predicate per tree level, chained the same way
//! the levels themselves nest: `(pred, (pred, ... ()))`. Predicates are
//! reference-counted trait objects so a probe can hand the remaining chain
//! to a freshly built child cursor without re-capturing the closures.

use std::ops::RangeBounds;
use std::rc::Rc;

/// A predicate over one level's key type.
pub type KeyPredicate<K> = Rc<dyn Fn(&K) -> bool>;

/// Wraps a closure as a [`KeyPredicate`].
pub fn key_matches<K, F>(f: F) -> KeyPredicate<K>
where
    F: Fn(&K) -> bool + 'static,
{
    Rc::new(f)
}

/// Accepts every key; the identity element of a predicate chain.
pub fn any_key<K>() -> KeyPredicate<K> {
    Rc::new(|_| true)
}

/// Accepts exactly `key`.
pub fn key_equals<K>(key: K) -> KeyPredicate<K>
where
    K: PartialEq + 'static,
{
    Rc::new(move |candidate| *candidate == key)
}

/// Accepts keys within `range`.
pub fn key_in<K, R>(range: R) -> KeyPredicate<K>
where
    K: PartialOrd + 'static,
    R: RangeBounds<K> + 'static,
{
    Rc::new(move |candidate| range.contains(candidate))
}
