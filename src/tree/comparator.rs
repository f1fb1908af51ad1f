//! Key ordering strategies.
//!
//! The engine never compares keys directly; it asks a [`KeyComparator`].
//! [`NaturalOrder`] serves integer (and any `Ord`) keys, [`FnComparator`]
//! wraps a caller-supplied 3-way function over opaque keys.

use std::cmp::Ordering;
use std::fmt;

/// A total order over keys of type `K`.
pub trait KeyComparator<K> {
    /// Compares two keys.
    fn compare(&self, left: &K, right: &K) -> Ordering;

    /// Whether this is the key type's own `Ord`.
    ///
    /// The validator only checks antisymmetry and transitivity for
    /// comparators that are not natural.
    fn is_natural(&self) -> bool {
        false
    }
}

/// Orders keys by their `Ord` implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord> KeyComparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, left: &K, right: &K) -> Ordering {
        left.cmp(right)
    }

    fn is_natural(&self) -> bool {
        true
    }
}

/// Orders keys with a caller-supplied 3-way function.
///
/// # Examples
///
/// ```rust
/// use threaded_rbtree::tree::CmpTree;
///
/// // Case-insensitive names
/// let mut tree = CmpTree::with_comparator(|left: &String, right: &String| {
///     left.to_lowercase().cmp(&right.to_lowercase())
/// });
/// tree.insert("Ethernet0".to_string(), 0).unwrap();
/// assert!(tree.insert("ETHERNET0".to_string(), 1).is_err());
/// ```
#[derive(Clone, Copy)]
pub struct FnComparator<F>(F);

impl<F> FnComparator<F> {
    /// Wraps `compare`.
    pub const fn new(compare: F) -> Self {
        Self(compare)
    }
}

impl<F> fmt::Debug for FnComparator<F> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("FnComparator")
    }
}

impl<K, F> KeyComparator<K> for FnComparator<F>
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, left: &K, right: &K) -> Ordering {
        (self.0)(left, right)
    }
}
