//! Structural cloning.
//!
//! A clone reproduces the source tree node for node: same colors, same
//! shape, every child link and thread re-targeted into the new arena. No
//! rebalancing happens, so the copy has exactly the source's depth.

use super::allocator::NodeAllocator;
use super::comparator::KeyComparator;
use super::engine::RbTree;
use super::error::TreeError;
use super::node::{Direction, Link, Node, NodeId};

impl<K: Clone, V, C: KeyComparator<K> + Clone, A: NodeAllocator> RbTree<K, V, C, A> {
    /// Clones the tree into a fresh default allocator.
    ///
    /// # Errors
    ///
    /// [`TreeError::NoMemory`] if the allocator refuses a node (nothing is
    /// leaked), [`TreeError::Uninitialized`] if the tree is not live.
    pub fn try_clone(&self) -> Result<Self, TreeError>
    where
        V: Clone,
        A: Default,
    {
        self.try_clone_in(A::default())
    }

    /// Clones the tree into `allocator`.
    ///
    /// # Errors
    ///
    /// As [`try_clone`](Self::try_clone).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use threaded_rbtree::tree::{CappedAllocator, IntTree, TreeError};
    ///
    /// let mut tree = IntTree::new();
    /// for key in [1, 3, 5, 7] {
    ///     tree.insert(key, key * 2).unwrap();
    /// }
    ///
    /// let copy = tree.try_clone_in(CappedAllocator::new(4)).unwrap();
    /// assert_eq!(copy.dump_string(), tree.dump_string());
    ///
    /// let refused = tree.try_clone_in(CappedAllocator::new(3));
    /// assert!(matches!(refused, Err(TreeError::NoMemory)));
    /// ```
    pub fn try_clone_in<B: NodeAllocator>(
        &self,
        allocator: B,
    ) -> Result<RbTree<K, V, C, B>, TreeError>
    where
        V: Clone,
    {
        self.clone_map_in(allocator, &mut (), |value, _| Some(value.clone()))
    }

    /// Clones the tree into a fresh default allocator, transforming every
    /// value.
    ///
    /// # Errors
    ///
    /// As [`clone_map_in`](Self::clone_map_in).
    pub fn clone_map<W, X, F>(&self, context: &mut X, transform: F) -> Result<RbTree<K, W, C, A>, TreeError>
    where
        A: Default,
        F: FnMut(&V, &mut X) -> Option<W>,
    {
        self.clone_map_in(A::default(), context, transform)
    }

    /// Clones the tree into `allocator`, passing every value through
    /// `transform` in ascending key order.
    ///
    /// `context` is handed to every `transform` call. When `transform`
    /// returns `None` or a node cannot be allocated, every node built so
    /// far is released again before the error is returned.
    ///
    /// # Errors
    ///
    /// [`TreeError::TransformFailed`] if `transform` declines a value,
    /// [`TreeError::NoMemory`] if the allocator refuses a node,
    /// [`TreeError::Uninitialized`] if the tree is not live.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use threaded_rbtree::tree::{IntTree, SystemAllocator};
    ///
    /// let mut tree = IntTree::new();
    /// tree.insert(1, "1").unwrap();
    /// tree.insert(2, "two").unwrap();
    ///
    /// let mut parsed = 0;
    /// let result = tree.clone_map_in(SystemAllocator, &mut parsed, |value, parsed| {
    ///     let number = value.parse::<u32>().ok()?;
    ///     *parsed += 1;
    ///     Some(number)
    /// });
    /// assert!(result.is_err());
    /// assert_eq!(parsed, 1);
    /// ```
    pub fn clone_map_in<W, X, B, F>(
        &self,
        allocator: B,
        context: &mut X,
        mut transform: F,
    ) -> Result<RbTree<K, W, C, B>, TreeError>
    where
        B: NodeAllocator,
        F: FnMut(&V, &mut X) -> Option<W>,
    {
        self.ensure_live()?;
        let mut copy = RbTree::new_in(self.comparator.clone(), allocator);

        // Source node index -> copied node.
        let mut mapping: Vec<Option<NodeId>> = vec![None; self.arena.index_bound()];
        let mut copied = Vec::with_capacity(self.len);
        let mut next = self.extreme(Direction::Left);
        while let Some(source) = next {
            next = self.step(source, Direction::Right);
            let node = &self.arena[source];
            let Some(value) = transform(&node.value, context) else {
                return Err(roll_back(&mut copy, TreeError::TransformFailed));
            };
            let mut fresh = Node::new(node.key.clone(), value);
            fresh.color = node.color;
            fresh.weight = node.weight;
            let Ok(target) = copy.arena.allocate(fresh) else {
                return Err(roll_back(&mut copy, TreeError::NoMemory));
            };
            mapping[source.index()] = Some(target);
            copied.push((source, target));
        }

        let retarget = |id: NodeId| mapping.get(id.index()).copied().flatten();
        for (source, target) in copied {
            for side in Direction::BOTH {
                let link = match self.arena[source].link(side) {
                    Link::Child(child) => retarget(child).map_or(Link::Thread(None), Link::Child),
                    Link::Thread(neighbor) => Link::Thread(neighbor.and_then(retarget)),
                };
                copy.arena[target].set_link(side, link);
            }
        }
        copy.root = self.root.and_then(retarget);
        copy.len = self.len;
        Ok(copy)
    }
}

/// Releases every node of a partially built clone.
fn roll_back<K, W, C, B: NodeAllocator>(copy: &mut RbTree<K, W, C, B>, error: TreeError) -> TreeError {
    let mut released = 0_usize;
    copy.arena.drain(|_| released += 1);
    tracing::debug!(released, %error, "clone rolled back");
    error
}
