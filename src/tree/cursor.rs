//! Cursors and iterators.
//!
//! A [`Cursor`] is a detached, fail-fast position: it does not borrow the
//! tree, so the tree may be mutated while a cursor exists, and the next
//! [`Cursor::next`] call then reports [`TreeError::ModifiedWhileIterating`]
//! instead of returning data.
//!
//! [`Iter`], [`Keys`] and [`Values`] borrow the tree; the borrow rules out
//! mutation, so they are plain Rust iterators.

use std::iter::FusedIterator;

use super::allocator::NodeAllocator;
use super::comparator::KeyComparator;
use super::engine::RbTree;
use super::error::TreeError;
use super::node::{Direction, NodeId};

// =============================================================================
// Cursor
// =============================================================================

/// A fail-fast position in a tree.
///
/// # Examples
///
/// ```rust
/// use threaded_rbtree::tree::{Direction, IntTree, TreeError};
///
/// let mut tree = IntTree::new();
/// for key in [1, 2, 3] {
///     tree.insert(key, ()).unwrap();
/// }
///
/// let mut cursor = tree.cursor(Direction::Left);
/// assert_eq!(cursor.next(&tree), Ok((&3, &())));
///
/// tree.insert(4, ()).unwrap();
/// assert_eq!(cursor.next(&tree), Err(TreeError::ModifiedWhileIterating));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    serial: u64,
    position: Option<NodeId>,
    direction: Direction,
}

impl Cursor {
    /// The direction this cursor walks in.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns the entry under the cursor and advances it.
    ///
    /// # Errors
    ///
    /// [`TreeError::NoMore`] once the cursor has walked past the last entry,
    /// [`TreeError::ModifiedWhileIterating`] if the tree was inserted into or
    /// removed from since the cursor was created,
    /// [`TreeError::Uninitialized`] if the tree is not live.
    pub fn next<'t, K, V, C, A>(
        &mut self,
        tree: &'t RbTree<K, V, C, A>,
    ) -> Result<(&'t K, &'t V), TreeError> {
        tree.ensure_live()?;
        if tree.serial() != self.serial {
            return Err(TreeError::ModifiedWhileIterating);
        }
        let id = self.position.ok_or(TreeError::NoMore)?;
        if tree.arena.get(id).is_none() {
            return Err(TreeError::ModifiedWhileIterating);
        }
        self.position = tree.step(id, self.direction);
        Ok(tree.entry(id))
    }
}

impl<K, V, C: KeyComparator<K>, A: NodeAllocator> RbTree<K, V, C, A> {
    fn cursor_from(&self, position: Option<NodeId>, direction: Direction) -> Cursor {
        Cursor {
            serial: self.serial(),
            position,
            direction,
        }
    }

    /// Creates a cursor at the tree extreme it walks away from: the smallest
    /// key for `Right`, the largest for `Left`.
    #[must_use]
    pub fn cursor(&self, direction: Direction) -> Cursor {
        self.cursor_from(self.extreme(direction.opposite()), direction)
    }

    /// Creates a cursor positioned on `key`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `key` is absent,
    /// [`TreeError::Uninitialized`] if the tree is not live.
    pub fn cursor_at(&self, key: &K, direction: Direction) -> Result<Cursor, TreeError> {
        self.ensure_live()?;
        let id = self.locate(key).ok_or(TreeError::NotFound)?;
        Ok(self.cursor_from(Some(id), direction))
    }

    /// Creates an ascending cursor at the first key strictly greater than
    /// `key`, which need not be present.
    ///
    /// # Errors
    ///
    /// [`TreeError::Uninitialized`] if the tree is not live.
    pub fn cursor_after(&self, key: &K) -> Result<Cursor, TreeError> {
        self.ensure_live()?;
        Ok(self.cursor_from(
            self.locate_beyond(key, Direction::Right),
            Direction::Right,
        ))
    }

    /// Creates a descending cursor at the first key strictly smaller than
    /// `key`, which need not be present.
    ///
    /// # Errors
    ///
    /// [`TreeError::Uninitialized`] if the tree is not live.
    pub fn cursor_before(&self, key: &K) -> Result<Cursor, TreeError> {
        self.ensure_live()?;
        Ok(self.cursor_from(
            self.locate_beyond(key, Direction::Left),
            Direction::Left,
        ))
    }
}

// =============================================================================
// Borrowing Iterators
// =============================================================================

impl<K, V, C, A> RbTree<K, V, C, A> {
    /// Returns an iterator over the entries in ascending key order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use threaded_rbtree::tree::IntTree;
    ///
    /// let mut tree = IntTree::new();
    /// tree.insert(2, "two").unwrap();
    /// tree.insert(1, "one").unwrap();
    ///
    /// let entries: Vec<(&u64, &&str)> = tree.iter().collect();
    /// assert_eq!(entries, vec![(&1, &"one"), (&2, &"two")]);
    /// assert_eq!(tree.iter().rev().next(), Some((&2, &"two")));
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V, C, A> {
        Iter {
            tree: self,
            front: self.extreme(Direction::Left),
            back: self.extreme(Direction::Right),
            remaining: self.len(),
        }
    }

    /// Returns an iterator over the keys in ascending order.
    pub fn keys(&self) -> Keys<'_, K, V, C, A> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values in ascending key order.
    pub fn values(&self) -> Values<'_, K, V, C, A> {
        Values { inner: self.iter() }
    }
}

/// Iterator over the entries of a tree, in key order.
pub struct Iter<'a, K, V, C, A> {
    tree: &'a RbTree<K, V, C, A>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<'a, K, V, C, A> Iterator for Iter<'a, K, V, C, A> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.front?;
        self.remaining -= 1;
        self.front = self.tree.step(id, Direction::Right);
        Some(self.tree.entry(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, C, A> DoubleEndedIterator for Iter<'_, K, V, C, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.back?;
        self.remaining -= 1;
        self.back = self.tree.step(id, Direction::Left);
        Some(self.tree.entry(id))
    }
}

impl<K, V, C, A> ExactSizeIterator for Iter<'_, K, V, C, A> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V, C, A> FusedIterator for Iter<'_, K, V, C, A> {}

/// Iterator over the keys of a tree.
pub struct Keys<'a, K, V, C, A> {
    inner: Iter<'a, K, V, C, A>,
}

impl<'a, K, V, C, A> Iterator for Keys<'a, K, V, C, A> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, C, A> DoubleEndedIterator for Keys<'_, K, V, C, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(key, _)| key)
    }
}

impl<K, V, C, A> ExactSizeIterator for Keys<'_, K, V, C, A> {}

/// Iterator over the values of a tree, in key order.
pub struct Values<'a, K, V, C, A> {
    inner: Iter<'a, K, V, C, A>,
}

impl<'a, K, V, C, A> Iterator for Values<'a, K, V, C, A> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, C, A> DoubleEndedIterator for Values<'_, K, V, C, A> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<K, V, C, A> ExactSizeIterator for Values<'_, K, V, C, A> {}

impl<'a, K, V, C, A> IntoIterator for &'a RbTree<K, V, C, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, C, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::IntTree;
    use rstest::rstest;

    fn tree_of(keys: &[u64]) -> IntTree<u64> {
        let mut tree = IntTree::new();
        for &key in keys {
            tree.insert(key, key + 100).unwrap();
        }
        tree
    }

    fn drain(cursor: &mut Cursor, tree: &IntTree<u64>) -> Vec<u64> {
        let mut keys = Vec::new();
        while let Ok((key, _)) = cursor.next(tree) {
            keys.push(*key);
        }
        keys
    }

    #[rstest]
    #[case(Direction::Right, vec![1, 3, 4, 5, 7, 8, 9])]
    #[case(Direction::Left, vec![9, 8, 7, 5, 4, 3, 1])]
    fn test_cursor_from_extreme(#[case] direction: Direction, #[case] expected: Vec<u64>) {
        let tree = tree_of(&[5, 3, 8, 1, 4, 7, 9]);
        let mut cursor = tree.cursor(direction);
        assert_eq!(drain(&mut cursor, &tree), expected);
        assert_eq!(cursor.next(&tree), Err(TreeError::NoMore));
    }

    #[rstest]
    fn test_cursor_at_key_both_directions() {
        let tree = tree_of(&[10, 20, 30, 40]);
        let mut forward = tree.cursor_at(&20, Direction::Right).unwrap();
        assert_eq!(drain(&mut forward, &tree), vec![20, 30, 40]);
        let mut backward = tree.cursor_at(&30, Direction::Left).unwrap();
        assert_eq!(drain(&mut backward, &tree), vec![30, 20, 10]);
        assert_eq!(tree.cursor_at(&25, Direction::Right), Err(TreeError::NotFound));
    }

    #[rstest]
    fn test_cursor_after_skips_exact_match() {
        let tree = tree_of(&[10, 20, 30]);
        let mut after = tree.cursor_after(&20).unwrap();
        assert_eq!(drain(&mut after, &tree), vec![30]);
        let mut between = tree.cursor_after(&15).unwrap();
        assert_eq!(drain(&mut between, &tree), vec![20, 30]);
        let mut before = tree.cursor_before(&20).unwrap();
        assert_eq!(drain(&mut before, &tree), vec![10]);
    }

    #[rstest]
    fn test_cursor_on_empty_tree() {
        let tree = tree_of(&[]);
        let mut cursor = tree.cursor(Direction::Right);
        assert_eq!(cursor.next(&tree), Err(TreeError::NoMore));
    }

    #[rstest]
    fn test_cursor_detects_removal() {
        let mut tree = tree_of(&[1, 2, 3]);
        let mut cursor = tree.cursor(Direction::Right);
        assert_eq!(cursor.next(&tree), Ok((&1, &101)));
        tree.remove(&2).unwrap();
        assert_eq!(cursor.next(&tree), Err(TreeError::ModifiedWhileIterating));
        assert_eq!(cursor.next(&tree), Err(TreeError::ModifiedWhileIterating));
    }

    #[rstest]
    fn test_cursor_survives_failed_mutations() {
        let mut tree = tree_of(&[1, 2, 3]);
        let mut cursor = tree.cursor(Direction::Right);
        assert!(tree.insert(2, 0).is_err());
        assert!(tree.remove(&9).is_err());
        assert_eq!(drain(&mut cursor, &tree), vec![1, 2, 3]);
    }

    #[rstest]
    fn test_iter_is_double_ended_and_exact() {
        let tree = tree_of(&[4, 2, 6, 1, 3, 5, 7]);
        let mut iter = tree.iter();
        assert_eq!(iter.len(), 7);
        assert_eq!(iter.next(), Some((&1, &101)));
        assert_eq!(iter.next_back(), Some((&7, &107)));
        assert_eq!(iter.len(), 5);
        let middle: Vec<u64> = iter.map(|(key, _)| *key).collect();
        assert_eq!(middle, vec![2, 3, 4, 5, 6]);
        let values: Vec<u64> = tree.values().rev().copied().collect();
        assert_eq!(values, vec![107, 106, 105, 104, 103, 102, 101]);
    }
}
