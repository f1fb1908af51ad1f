//! Pluggable node allocation.
//!
//! Nodes live in a [`Slab`] owned by the tree. The arena asks a
//! [`NodeAllocator`] to admit every new node and tells it about every
//! released one, so callers can bound or account for the tree's memory.

use std::ops::{Index, IndexMut};

use slab::Slab;

use super::error::AllocError;
use super::node::{Node, NodeId};

/// The allocate/free pair consulted for every node.
///
/// # Examples
///
/// ```rust
/// use threaded_rbtree::tree::{CappedAllocator, IntTree, NaturalOrder, TreeError};
///
/// let mut tree = IntTree::<(), CappedAllocator>::new_in(NaturalOrder, CappedAllocator::new(2));
/// tree.insert(1, ()).unwrap();
/// tree.insert(2, ()).unwrap();
///
/// let error = tree.insert(3, ()).unwrap_err();
/// assert_eq!(error.kind(), TreeError::NoMemory);
/// assert_eq!(tree.len(), 2);
/// ```
pub trait NodeAllocator {
    /// Admits one more node.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] when the node cannot be admitted.
    fn allocate(&mut self) -> Result<(), AllocError>;

    /// Releases one previously admitted node.
    fn free(&mut self);
}

/// Admits every node; only real exhaustion of the heap is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemAllocator;

impl NodeAllocator for SystemAllocator {
    #[inline]
    fn allocate(&mut self) -> Result<(), AllocError> {
        Ok(())
    }

    #[inline]
    fn free(&mut self) {}
}

/// Admits at most `capacity` live nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CappedAllocator {
    capacity: usize,
    live: usize,
}

impl CappedAllocator {
    /// Creates an allocator admitting up to `capacity` nodes.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self { capacity, live: 0 }
    }

    /// Number of nodes currently admitted.
    #[must_use]
    pub const fn live(&self) -> usize {
        self.live
    }

    /// Maximum number of nodes admitted at once.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl NodeAllocator for CappedAllocator {
    fn allocate(&mut self) -> Result<(), AllocError> {
        if self.live >= self.capacity {
            return Err(AllocError);
        }
        self.live += 1;
        Ok(())
    }

    fn free(&mut self) {
        self.live = self.live.saturating_sub(1);
    }
}

/// Slab storage for nodes, gated by a [`NodeAllocator`].
pub(crate) struct NodeArena<K, V, A> {
    slab: Slab<Node<K, V>>,
    allocator: A,
}

impl<K, V, A> NodeArena<K, V, A> {
    pub(crate) const fn new(allocator: A) -> Self {
        Self {
            slab: Slab::new(),
            allocator,
        }
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<K, V>> {
        self.slab.get(id.index())
    }

    /// Number of live nodes.
    pub(crate) fn len(&self) -> usize {
        self.slab.len()
    }

    /// Every node index handed out so far is below this bound.
    pub(crate) fn index_bound(&self) -> usize {
        self.slab.capacity()
    }

    pub(crate) const fn allocator(&self) -> &A {
        &self.allocator
    }
}

impl<K, V, A: NodeAllocator> NodeArena<K, V, A> {
    /// Stores `node`, handing it back if the allocator refuses it.
    pub(crate) fn allocate(&mut self, node: Node<K, V>) -> Result<NodeId, Node<K, V>> {
        if self.allocator.allocate().is_err() {
            return Err(node);
        }
        Ok(NodeId::new(self.slab.insert(node)))
    }

    /// Takes the node out of its slot and returns it to the allocator.
    pub(crate) fn free(&mut self, id: NodeId) -> Option<Node<K, V>> {
        let node = self.slab.try_remove(id.index())?;
        self.allocator.free();
        Some(node)
    }

    /// Takes the node out of its slot and hands it to `dispose` before the
    /// allocator hears about the release.
    pub(crate) fn dispose_with(&mut self, id: NodeId, dispose: impl FnOnce(Node<K, V>)) -> bool {
        let Some(node) = self.slab.try_remove(id.index()) else {
            return false;
        };
        dispose(node);
        self.allocator.free();
        true
    }

    /// Releases every node, handing each one to `dispose`.
    pub(crate) fn drain(&mut self, mut dispose: impl FnMut(Node<K, V>)) {
        for node in self.slab.drain() {
            dispose(node);
            self.allocator.free();
        }
    }

    /// Forgets all slots. Every node must already have been freed.
    pub(crate) fn reset(&mut self) {
        debug_assert!(self.slab.is_empty());
        self.slab.clear();
    }
}

/// # Panics
///
/// Panics if `id` names a vacant slot.
impl<K, V, A> Index<NodeId> for NodeArena<K, V, A> {
    type Output = Node<K, V>;

    #[inline]
    fn index(&self, id: NodeId) -> &Self::Output {
        &self.slab[id.index()]
    }
}

/// # Panics
///
/// Panics if `id` names a vacant slot.
impl<K, V, A> IndexMut<NodeId> for NodeArena<K, V, A> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.slab[id.index()]
    }
}
