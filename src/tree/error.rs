//! Error types for the threaded red-black tree.
//!
//! Every fallible operation reports one of the [`TreeError`] kinds to its
//! immediate caller. Nothing is retried internally and nothing is swallowed.

use std::fmt;

use super::validate::Violation;

/// Errors reported by tree operations.
///
/// # Examples
///
/// ```rust
/// use threaded_rbtree::tree::{IntTree, TreeError};
///
/// let tree: IntTree<&str> = IntTree::new();
/// assert_eq!(tree.find(&7), Err(TreeError::NotFound));
/// assert_eq!(format!("{}", TreeError::NotFound), "key not found");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// The key is not present.
    NotFound,
    /// Insert was given a key that is already present.
    AlreadyExists,
    /// The node allocator refused to admit another node.
    NoMemory,
    /// A cursor is exhausted, or a neighbor query reached a tree extreme.
    NoMore,
    /// The tree changed structurally after the cursor was created.
    ModifiedWhileIterating,
    /// The tree was never initialized, or has been destroyed.
    Uninitialized,
    /// `init` was called on a tree that is already live.
    AlreadyInitialized,
    /// A clone transform declined to produce a value.
    TransformFailed,
    /// The validator found a broken invariant.
    Corrupted(Violation),
}

impl fmt::Display for TreeError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(formatter, "key not found"),
            Self::AlreadyExists => write!(formatter, "key already exists"),
            Self::NoMemory => write!(formatter, "node allocation failed"),
            Self::NoMore => write!(formatter, "no more entries"),
            Self::ModifiedWhileIterating => {
                write!(formatter, "tree modified while iterating")
            }
            Self::Uninitialized => write!(formatter, "tree is not initialized"),
            Self::AlreadyInitialized => write!(formatter, "tree is already initialized"),
            Self::TransformFailed => write!(formatter, "clone transform failed"),
            Self::Corrupted(violation) => write!(formatter, "tree corrupted: {violation}"),
        }
    }
}

impl std::error::Error for TreeError {}

/// A rejected insert.
///
/// Ownership of the key and value goes back to the caller together with
/// the reason, so nothing is lost when the tree refuses an entry.
///
/// # Examples
///
/// ```rust
/// use threaded_rbtree::tree::{IntTree, TreeError};
///
/// let mut tree = IntTree::new();
/// tree.insert(1, "one".to_string()).unwrap();
///
/// let error = tree.insert(1, "uno".to_string()).unwrap_err();
/// assert_eq!(error.kind(), TreeError::AlreadyExists);
/// assert_eq!(error.into_inner(), (1, "uno".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertError<K, V> {
    kind: TreeError,
    key: K,
    value: V,
}

impl<K, V> InsertError<K, V> {
    pub(crate) const fn new(kind: TreeError, key: K, value: V) -> Self {
        Self { kind, key, value }
    }

    /// Returns why the insert was rejected.
    pub const fn kind(&self) -> TreeError {
        self.kind
    }

    /// Returns the rejected key.
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Returns the rejected value.
    pub const fn value(&self) -> &V {
        &self.value
    }

    /// Takes back the rejected key and value.
    pub fn into_inner(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> fmt::Display for InsertError<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "insert rejected: {}", self.kind)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> std::error::Error for InsertError<K, V> {}

impl<K, V> From<InsertError<K, V>> for TreeError {
    fn from(error: InsertError<K, V>) -> Self {
        error.kind
    }
}

/// The allocator refused to admit a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocError;

impl fmt::Display for AllocError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "node allocation refused")
    }
}

impl std::error::Error for AllocError {}

impl From<AllocError> for TreeError {
    fn from(_: AllocError) -> Self {
        Self::NoMemory
    }
}
