//! # threaded-rbtree
//!
//! Ordered maps backed by threaded red-black trees.
//!
//! ## Overview
//!
//! A threaded red-black tree is a balanced binary search tree whose empty
//! child slots point at the in-order neighbors instead of nowhere. This
//! crate provides:
//!
//! - **Core engine**: top-down insert and remove, exact lookup, neighbor
//!   queries and weighted random sampling, generic over the key ordering
//!   and the node allocator
//! - **Façades**: `IntTree` for `u64` keys, `CmpTree` for opaque keys with
//!   a comparator function
//! - **Cursors**: detached, fail-fast cursors plus borrowing iterators
//! - **Tooling**: structural clone, invariant validator, debug dump
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize` for every tree, `Deserialize` for natural-order
//!   trees
//!
//! ## Example
//!
//! ```rust
//! use threaded_rbtree::prelude::*;
//!
//! let mut tree = IntTree::new();
//! tree.insert(2, "two").unwrap();
//! tree.insert(1, "one").unwrap();
//!
//! assert_eq!(tree.find(&1), Ok(&"one"));
//! assert_eq!(tree.predecessor(&2), Ok((&1, &"one")));
//! assert_eq!(tree.insert(1, "uno").unwrap_err().kind(), TreeError::AlreadyExists);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```rust
/// use threaded_rbtree::prelude::*;
/// ```
pub mod prelude {
    pub use crate::tree::{CmpTree, Direction, Disposal, IntTree, RbTree, TreeError};
}

pub mod tree;
