//! Threaded red-black trees.
//!
//! This module provides one ordered map engine, [`RbTree`], and two façades
//! over it:
//!
//! - [`IntTree`]: `u64` keys in natural order
//! - [`CmpTree`]: arbitrary keys ordered by a caller-supplied comparator
//!
//! # Threading
//!
//! A link slot that holds no child holds a thread to the in-order neighbor
//! on that side. Predecessor and successor queries, cursors and iterators
//! walk these threads, so stepping costs O(1) amortized and needs no stack.
//!
//! # Fail-Fast Cursors
//!
//! A [`Cursor`] does not borrow the tree. It remembers the tree's
//! modification serial and refuses to continue once an insert or remove
//! has happened since it was created.
//!
//! # Examples
//!
//! ## `IntTree`
//!
//! ```rust
//! use threaded_rbtree::tree::{Direction, IntTree, TreeError};
//!
//! let mut tree = IntTree::new();
//! for key in 1..=1024 {
//!     tree.insert(key, key).unwrap();
//! }
//! for key in (2..=1024).step_by(2) {
//!     tree.remove(&key).unwrap();
//! }
//!
//! assert_eq!(tree.len(), 512);
//! assert_eq!(tree.successor(&511), Ok((&513, &513)));
//! assert!(tree.validate().is_ok());
//!
//! let mut cursor = tree.cursor(Direction::Left);
//! assert_eq!(cursor.next(&tree), Ok((&1023, &1023)));
//! tree.remove(&1).unwrap();
//! assert_eq!(cursor.next(&tree), Err(TreeError::ModifiedWhileIterating));
//! ```
//!
//! ## `CmpTree`
//!
//! ```rust
//! use threaded_rbtree::tree::CmpTree;
//!
//! #[derive(Debug, Clone, PartialEq, Eq)]
//! struct Rule {
//!     priority: u32,
//!     name: &'static str,
//! }
//!
//! let mut rules = CmpTree::with_comparator(|left: &Rule, right: &Rule| {
//!     right.priority.cmp(&left.priority)
//! });
//! rules.insert(Rule { priority: 10, name: "deny" }, ()).unwrap();
//! rules.insert(Rule { priority: 90, name: "allow" }, ()).unwrap();
//!
//! let first = rules.min().map(|(rule, _)| rule.name);
//! assert_eq!(first, Some("allow"));
//! ```

mod allocator;
mod clone;
mod comparator;
mod cursor;
mod dump;
mod engine;
mod error;
mod node;
mod observer;
#[cfg(feature = "serde")]
mod serde_impl;
mod validate;

pub use allocator::CappedAllocator;
pub use allocator::NodeAllocator;
pub use allocator::SystemAllocator;
pub use comparator::FnComparator;
pub use comparator::KeyComparator;
pub use comparator::NaturalOrder;
pub use cursor::Cursor;
pub use cursor::Iter;
pub use cursor::Keys;
pub use cursor::Values;
pub use engine::RbTree;
pub use error::AllocError;
pub use error::InsertError;
pub use error::TreeError;
pub use node::Color;
pub use node::Direction;
pub use observer::Disposal;
pub use observer::Neighborhood;
pub use observer::Observer;
pub use validate::Violation;

/// Tree keyed by `u64` in natural order.
pub type IntTree<V, A = SystemAllocator> = RbTree<u64, V, NaturalOrder, A>;

/// Tree keyed by `K`, ordered by the comparator function `F`.
pub type CmpTree<K, V, F, A = SystemAllocator> = RbTree<K, V, FnComparator<F>, A>;
