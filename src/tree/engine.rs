//! The threaded red-black tree engine.
//!
//! [`RbTree`] is a single generic engine parameterized by a
//! [`KeyComparator`] and a [`NodeAllocator`]. Both public façades,
//! [`IntTree`](super::IntTree) and [`CmpTree`](super::CmpTree), are aliases
//! of it.
//!
//! # Internal Structure
//!
//! Insert and remove are top-down single-pass algorithms: color flips and
//! rotations happen on the way down, so no bottom-up fix-up pass (and no
//! parent pointer) is needed. A "false root" above the real root is
//! represented by `None` in the parent/grandparent positions; its right
//! link is the root slot.
//!
//! Every link slot that does not hold a real child holds a thread to the
//! in-order neighbor on that side, which makes neighbor queries and
//! iteration O(1) amortized without a traversal stack.
//!
//! Every node also carries the weight (node count) of its subtree. Rotations
//! re-weigh the two nodes they move; inserts and removes re-weigh the path
//! whose membership changed once the structural work is done.

use std::cmp::Ordering;
use std::mem;

use rand::Rng;
use smallvec::SmallVec;

use super::allocator::{NodeAllocator, NodeArena, SystemAllocator};
use super::comparator::{FnComparator, KeyComparator, NaturalOrder};
use super::error::{InsertError, TreeError};
use super::node::{Color, Direction, Link, Node, NodeId};
use super::observer::{Disposal, Neighborhood, Observer};

/// Tag stored in a live tree; a zeroed tree carries 0.
const LIVE_SIGNATURE: u32 = 0x5242_5452;

/// Path length kept inline while re-weighing after an insert or remove.
const INLINE_PATH: usize = 64;

// =============================================================================
// RbTree Definition
// =============================================================================

/// An ordered map backed by a threaded red-black tree.
///
/// Keys are unique: inserting a present key is rejected, never overwritten.
/// A value can only be replaced by removing and reinserting its key.
///
/// # Time Complexity
///
/// | Operation                    | Complexity         |
/// |------------------------------|--------------------|
/// | `insert`                     | O(log N)           |
/// | `remove`                     | O(log N)           |
/// | `find`                       | O(log N)           |
/// | `predecessor` / `successor`  | O(log N)           |
/// | `find_random`                | O(log N)           |
/// | cursor / iterator step       | O(1) amortized     |
/// | `len`                        | O(1)               |
///
/// # Examples
///
/// ```rust
/// use threaded_rbtree::tree::IntTree;
///
/// let mut tree = IntTree::new();
/// for key in [5, 3, 8, 1, 4, 7, 9] {
///     tree.insert(key, key * 10).unwrap();
/// }
///
/// let keys: Vec<u64> = tree.keys().copied().collect();
/// assert_eq!(keys, vec![1, 3, 4, 5, 7, 8, 9]);
/// assert_eq!(tree.successor(&5), Ok((&7, &70)));
/// assert!(tree.validate().is_ok());
/// ```
pub struct RbTree<K, V, C = NaturalOrder, A = SystemAllocator> {
    signature: u32,
    pub(crate) root: Option<NodeId>,
    pub(crate) len: usize,
    serial: u64,
    pub(crate) arena: NodeArena<K, V, A>,
    pub(crate) comparator: C,
    on_insert: Option<Observer<K, V>>,
    on_remove: Option<Observer<K, V>>,
}

// =============================================================================
// Lifecycle and Accessors
// =============================================================================

impl<K, V, C, A> RbTree<K, V, C, A> {
    /// Creates a tree in the uninitialized state.
    ///
    /// This is the equivalent of a zero-filled instance: every fallible
    /// operation returns [`TreeError::Uninitialized`] until
    /// [`init`](Self::init) is called.
    #[must_use]
    pub const fn uninit_in(comparator: C, allocator: A) -> Self {
        Self {
            signature: 0,
            root: None,
            len: 0,
            serial: 0,
            arena: NodeArena::new(allocator),
            comparator,
            on_insert: None,
            on_remove: None,
        }
    }

    /// Creates an initialized, empty tree.
    #[must_use]
    pub const fn new_in(comparator: C, allocator: A) -> Self {
        let mut tree = Self::uninit_in(comparator, allocator);
        tree.signature = LIVE_SIGNATURE;
        tree
    }

    /// Returns `true` if the tree has been initialized and not destroyed.
    #[inline]
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.signature == LIVE_SIGNATURE
    }

    /// Returns the number of entries. An uninitialized tree reports 0.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree holds no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the modification serial.
    ///
    /// The serial changes on every insert and remove and never on a
    /// read-only operation.
    #[inline]
    #[must_use]
    pub const fn serial(&self) -> u64 {
        self.serial
    }

    /// Returns the node allocator.
    pub const fn allocator(&self) -> &A {
        self.arena.allocator()
    }

    /// Returns the key comparator.
    pub const fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Registers a callback invoked after every successful insert.
    pub fn set_insert_observer<F>(&mut self, observer: F)
    where
        F: FnMut(Neighborhood<'_, K, V>) + Send + 'static,
    {
        self.on_insert = Some(Box::new(observer));
    }

    /// Registers a callback invoked before every successful remove.
    pub fn set_remove_observer<F>(&mut self, observer: F)
    where
        F: FnMut(Neighborhood<'_, K, V>) + Send + 'static,
    {
        self.on_remove = Some(Box::new(observer));
    }

    /// Removes both observers.
    pub fn clear_observers(&mut self) {
        self.on_insert = None;
        self.on_remove = None;
    }

    pub(crate) const fn ensure_live(&self) -> Result<(), TreeError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(TreeError::Uninitialized)
        }
    }

    pub(crate) fn entry(&self, id: NodeId) -> (&K, &V) {
        let node = &self.arena[id];
        (&node.key, &node.value)
    }

    /// Reads a link of a node, or of the false root when `parent` is `None`.
    fn link_of(&self, parent: Option<NodeId>, direction: Direction) -> Link {
        match (parent, direction, self.root) {
            (Some(id), _, _) => self.arena[id].link(direction),
            (None, Direction::Right, Some(root)) => Link::Child(root),
            (None, _, _) => Link::Thread(None),
        }
    }

    fn set_link_of(&mut self, parent: Option<NodeId>, direction: Direction, link: Link) {
        match parent {
            Some(id) => self.arena[id].set_link(direction, link),
            None => {
                debug_assert_eq!(direction, Direction::Right);
                self.root = link.child();
            }
        }
    }

    fn is_red_link(&self, link: Link) -> bool {
        link.child().is_some_and(|id| self.arena[id].is_red())
    }

    fn has_red_child(&self, id: NodeId, direction: Direction) -> bool {
        self.is_red_link(self.arena[id].link(direction))
    }

    pub(crate) fn weight_of(&self, link: Link) -> usize {
        link.child().map_or(0, |id| self.arena[id].weight)
    }

    /// Recomputes the weight of `id` from its children.
    fn reweigh(&mut self, id: NodeId) {
        let node = &self.arena[id];
        let weight = 1
            + self.weight_of(node.link(Direction::Left))
            + self.weight_of(node.link(Direction::Right));
        self.arena[id].weight = weight;
    }

    /// Follows real children from `id` as far as possible towards `direction`.
    pub(crate) fn descend(&self, mut id: NodeId, direction: Direction) -> NodeId {
        while let Link::Child(next) = self.arena[id].link(direction) {
            id = next;
        }
        id
    }

    /// The in-order neighbor of `id` on `direction`.
    pub(crate) fn step(&self, id: NodeId, direction: Direction) -> Option<NodeId> {
        match self.arena[id].link(direction) {
            Link::Thread(neighbor) => neighbor,
            Link::Child(child) => Some(self.descend(child, direction.opposite())),
        }
    }

    /// The leftmost (`Left`) or rightmost (`Right`) node.
    pub(crate) fn extreme(&self, direction: Direction) -> Option<NodeId> {
        self.root.map(|root| self.descend(root, direction))
    }

    fn neighborhood(&self, id: NodeId) -> Neighborhood<'_, K, V> {
        let (key, value) = self.entry(id);
        Neighborhood {
            key,
            value,
            predecessor: self
                .step(id, Direction::Left)
                .map(|neighbor| self.entry(neighbor)),
            successor: self
                .step(id, Direction::Right)
                .map(|neighbor| self.entry(neighbor)),
        }
    }

    fn notify_insert(&mut self, id: NodeId) {
        if let Some(mut observer) = self.on_insert.take() {
            observer(self.neighborhood(id));
            self.on_insert = Some(observer);
        }
    }

    fn notify_remove(&mut self, id: NodeId) {
        if let Some(mut observer) = self.on_remove.take() {
            observer(self.neighborhood(id));
            self.on_remove = Some(observer);
        }
    }

    fn bump_serial(&mut self) {
        self.serial = self.serial.wrapping_add(1);
    }

    fn blacken_root(&mut self) {
        if let Some(root) = self.root {
            self.arena[root].color = Color::Black;
        }
    }

    /// Single rotation of `root` towards `direction`.
    ///
    /// The child on the opposite side becomes the new subtree root. If that
    /// child had no real inner subtree, `root` gets a thread back to it.
    fn rotate_single(&mut self, root: NodeId, direction: Direction) -> NodeId {
        let outward = direction.opposite();
        let Link::Child(pivot) = self.arena[root].link(outward) else {
            return root;
        };
        let inner = match self.arena[pivot].link(direction) {
            Link::Child(child) => Link::Child(child),
            Link::Thread(_) => Link::Thread(Some(pivot)),
        };
        self.arena[root].set_link(outward, inner);
        self.arena[pivot].set_link(direction, Link::Child(root));
        self.arena[root].color = Color::Red;
        self.arena[pivot].color = Color::Black;
        self.reweigh(root);
        self.reweigh(pivot);
        pivot
    }

    /// Double rotation of `root` towards `direction`.
    fn rotate_double(&mut self, root: NodeId, direction: Direction) -> NodeId {
        let outward = direction.opposite();
        if let Link::Child(child) = self.arena[root].link(outward) {
            let rotated = self.rotate_single(child, outward);
            self.arena[root].set_link(outward, Link::Child(rotated));
        }
        self.rotate_single(root, direction)
    }
}

impl<K: Ord, V> RbTree<K, V, NaturalOrder, SystemAllocator> {
    /// Creates an empty tree ordered by the key's `Ord`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use threaded_rbtree::tree::IntTree;
    ///
    /// let tree: IntTree<String> = IntTree::new();
    /// assert!(tree.is_empty());
    /// assert!(tree.is_initialized());
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        Self::new_in(NaturalOrder, SystemAllocator)
    }

    /// Creates an uninitialized tree ordered by the key's `Ord`.
    #[must_use]
    pub const fn uninit() -> Self {
        Self::uninit_in(NaturalOrder, SystemAllocator)
    }
}

impl<K: Ord, V> Default for RbTree<K, V, NaturalOrder, SystemAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, F> RbTree<K, V, FnComparator<F>, SystemAllocator> {
    /// Creates an empty tree ordered by `compare`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use threaded_rbtree::tree::CmpTree;
    ///
    /// let mut tree = CmpTree::with_comparator(|left: &u32, right: &u32| right.cmp(left));
    /// tree.insert(1, "one").unwrap();
    /// tree.insert(2, "two").unwrap();
    /// assert_eq!(tree.keys().copied().collect::<Vec<_>>(), vec![2, 1]);
    /// ```
    #[must_use]
    pub const fn with_comparator(compare: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering,
    {
        Self::new_in(FnComparator::new(compare), SystemAllocator)
    }
}

// =============================================================================
// Core Operations
// =============================================================================

impl<K, V, C: KeyComparator<K>, A: NodeAllocator> RbTree<K, V, C, A> {
    /// Brings an uninitialized tree into the live, empty state.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::AlreadyInitialized`] on a live tree.
    pub fn init(&mut self) -> Result<(), TreeError> {
        if self.is_initialized() {
            return Err(TreeError::AlreadyInitialized);
        }
        self.signature = LIVE_SIGNATURE;
        self.root = None;
        self.len = 0;
        tracing::debug!("tree initialized");
        Ok(())
    }

    /// Releases every entry and returns the tree to the uninitialized state.
    ///
    /// Entries are handed to `disposal` in ascending key order; each node is
    /// returned to the allocator right after its entry has been disposed of.
    /// Observers are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Uninitialized`] if the tree is not live.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use threaded_rbtree::tree::{Disposal, IntTree};
    ///
    /// let mut tree = IntTree::new();
    /// tree.insert(2, "b".to_string()).unwrap();
    /// tree.insert(1, "a".to_string()).unwrap();
    ///
    /// let mut released = Vec::new();
    /// tree.destroy(Disposal::Values(&mut |value| released.push(value))).unwrap();
    /// assert_eq!(released, vec!["a".to_string(), "b".to_string()]);
    /// assert!(!tree.is_initialized());
    /// ```
    pub fn destroy(&mut self, mut disposal: Disposal<'_, K, V>) -> Result<(), TreeError> {
        self.ensure_live()?;
        let entries = self.len;
        let mut next = self.extreme(Direction::Left);
        while let Some(id) = next {
            next = self.step(id, Direction::Right);
            self.arena.dispose_with(id, |node| disposal.dispose(node.key, node.value));
        }
        self.arena.reset();
        self.root = None;
        self.len = 0;
        self.bump_serial();
        self.signature = 0;
        self.clear_observers();
        tracing::debug!(entries, "tree destroyed");
        Ok(())
    }

    pub(crate) fn locate(&self, key: &K) -> Option<NodeId> {
        let mut current = self.root?;
        loop {
            let direction = match self.comparator.compare(key, &self.arena[current].key) {
                Ordering::Equal => return Some(current),
                Ordering::Less => Direction::Left,
                Ordering::Greater => Direction::Right,
            };
            current = self.arena[current].link(direction).child()?;
        }
    }

    /// Recomputes the weights on the path from the root down to `target`,
    /// bottom-up. Nodes off that path must already carry correct weights.
    fn reweigh_path(&mut self, target: NodeId) {
        let mut path: SmallVec<[NodeId; INLINE_PATH]> = SmallVec::new();
        let mut current = self.root;
        while let Some(id) = current {
            path.push(id);
            current = match self.comparator.compare(&self.arena[target].key, &self.arena[id].key) {
                Ordering::Equal => None,
                Ordering::Less => self.arena[id].link(Direction::Left).child(),
                Ordering::Greater => self.arena[id].link(Direction::Right).child(),
            };
        }
        for &id in path.iter().rev() {
            self.reweigh(id);
        }
    }

    /// The nearest node strictly beyond `key` on `direction`.
    pub(crate) fn locate_beyond(&self, key: &K, direction: Direction) -> Option<NodeId> {
        let wanted = match direction {
            Direction::Left => Ordering::Less,
            Direction::Right => Ordering::Greater,
        };
        let mut candidate = None;
        let mut current = self.root;
        while let Some(id) = current {
            if self.comparator.compare(&self.arena[id].key, key) == wanted {
                candidate = Some(id);
                current = self.arena[id].link(direction.opposite()).child();
            } else {
                current = self.arena[id].link(direction).child();
            }
        }
        candidate
    }

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if the key is absent,
    /// [`TreeError::Uninitialized`] if the tree is not live.
    pub fn find(&self, key: &K) -> Result<&V, TreeError> {
        self.ensure_live()?;
        self.locate(key)
            .map(|id| &self.arena[id].value)
            .ok_or(TreeError::NotFound)
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).ok()
    }

    /// Returns `true` if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Inserts a new entry.
    ///
    /// The node is allocated before the tree is touched, so a rejected
    /// insert leaves the tree exactly as it was and hands the key and value
    /// back inside the error.
    ///
    /// # Errors
    ///
    /// [`TreeError::AlreadyExists`] if the key is present,
    /// [`TreeError::NoMemory`] if the allocator refuses the node,
    /// [`TreeError::Uninitialized`] if the tree is not live.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), InsertError<K, V>> {
        if let Err(kind) = self.ensure_live() {
            return Err(InsertError::new(kind, key, value));
        }
        if self.locate(&key).is_some() {
            return Err(InsertError::new(TreeError::AlreadyExists, key, value));
        }
        let fresh = match self.arena.allocate(Node::new(key, value)) {
            Ok(id) => id,
            Err(node) => {
                tracing::trace!(len = self.len, "node allocation refused");
                return Err(InsertError::new(TreeError::NoMemory, node.key, node.value));
            }
        };

        match self.root {
            None => self.root = Some(fresh),
            Some(root) => {
                self.link_top_down(root, fresh);
                self.reweigh_path(fresh);
            }
        }
        self.blacken_root();
        self.len += 1;
        self.bump_serial();
        self.notify_insert(fresh);
        Ok(())
    }

    /// Descends from `root` towards the key of `fresh`, flipping colors and
    /// rotating on the way, and hangs `fresh` where the descent hits a thread.
    fn link_top_down(&mut self, root: NodeId, fresh: NodeId) {
        // `None` is the false root for `great`, "nothing yet" for the others.
        let mut great: Option<NodeId> = None;
        let mut grand: Option<NodeId> = None;
        let mut parent: Option<NodeId> = None;
        let mut current = root;
        let mut direction = Direction::Left;
        let mut last = Direction::Left;

        loop {
            if self.has_red_child(current, Direction::Left)
                && self.has_red_child(current, Direction::Right)
            {
                self.arena[current].color = Color::Red;
                for side in Direction::BOTH {
                    if let Link::Child(child) = self.arena[current].link(side) {
                        self.arena[child].color = Color::Black;
                    }
                }
            }

            if let (Some(up), Some(top)) = (parent, grand)
                && self.arena[current].is_red()
                && self.arena[up].is_red()
            {
                let side = Direction::from_bool(self.link_of(great, Direction::Right) == Link::Child(top));
                let rotated = if self.arena[up].link(last) == Link::Child(current) {
                    self.rotate_single(top, last.opposite())
                } else {
                    self.rotate_double(top, last.opposite())
                };
                self.set_link_of(great, side, Link::Child(rotated));
            }

            if current == fresh {
                break;
            }

            last = direction;
            direction = Direction::from_bool(
                self.comparator
                    .compare(&self.arena[current].key, &self.arena[fresh].key)
                    == Ordering::Less,
            );
            if grand.is_some() {
                great = grand;
            }
            grand = parent;
            parent = Some(current);

            match self.arena[current].link(direction) {
                Link::Child(child) => current = child,
                Link::Thread(neighbor) => {
                    let node = &mut self.arena[fresh];
                    node.set_link(direction, Link::Thread(neighbor));
                    node.set_link(direction.opposite(), Link::Thread(Some(current)));
                    self.arena[current].set_link(direction, Link::Child(fresh));
                    current = fresh;
                }
            }
        }
    }

    /// Removes `key` and returns its entry.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if the key is absent (the tree is left
    /// untouched), [`TreeError::Uninitialized`] if the tree is not live.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use threaded_rbtree::tree::{IntTree, TreeError};
    ///
    /// let mut tree = IntTree::new();
    /// tree.insert(1, "one").unwrap();
    ///
    /// assert_eq!(tree.remove(&1), Ok((1, "one")));
    /// assert_eq!(tree.remove(&1), Err(TreeError::NotFound));
    /// ```
    pub fn remove(&mut self, key: &K) -> Result<(K, V), TreeError> {
        self.ensure_live()?;
        if self.locate(key).is_none() {
            return Err(TreeError::NotFound);
        }
        self.remove_certain(key)
    }

    /// Removes `key` without checking that it is present first.
    ///
    /// Callers must know the key is present. On an absent key the descent
    /// has already recolored and rotated the tree: it stays a valid
    /// red-black tree, the serial changes and [`TreeError::NotFound`] is
    /// returned.
    ///
    /// # Errors
    ///
    /// See above, and [`TreeError::Uninitialized`] if the tree is not live.
    pub fn remove_certain(&mut self, key: &K) -> Result<(K, V), TreeError> {
        self.ensure_live()?;
        let Some(root) = self.root else {
            return Err(TreeError::NotFound);
        };
        let (found, parent, victim) = self.unlink_top_down(root, key);
        self.bump_serial();

        let removed = found.and_then(|target| {
            self.notify_remove(target);
            self.splice(target, parent, victim)
        });
        if removed.is_some()
            && let Some(parent) = parent
        {
            self.reweigh_path(parent);
        }
        self.blacken_root();
        removed.ok_or(TreeError::NotFound)
    }

    /// Descends towards `key` pushing a red node down ahead of the search.
    ///
    /// Returns the matched node, the parent of the node to unlink (`None`
    /// for the false root) and the node to unlink: the match itself or its
    /// in-order predecessor.
    fn unlink_top_down(
        &mut self,
        root: NodeId,
        key: &K,
    ) -> (Option<NodeId>, Option<NodeId>, NodeId) {
        let mut grand: Option<NodeId> = None;
        let mut parent: Option<NodeId> = None;
        let mut current: Option<NodeId> = None;
        let mut found = None;
        let mut victim = root;
        let mut direction = Direction::Right;

        while let Link::Child(next) = self.link_of(current, direction) {
            let last = direction;
            grand = parent;
            parent = current;
            current = Some(next);
            victim = next;

            let ordering = self.comparator.compare(&self.arena[next].key, key);
            direction = Direction::from_bool(ordering == Ordering::Less);
            if ordering == Ordering::Equal {
                found = Some(next);
            }

            if self.arena[next].is_red() || self.has_red_child(next, direction) {
                continue;
            }

            if self.has_red_child(next, direction.opposite()) {
                let rotated = self.rotate_single(next, direction);
                self.set_link_of(parent, last, Link::Child(rotated));
                parent = Some(rotated);
            } else if let Link::Child(sibling) = self.link_of(parent, last.opposite()) {
                if !self.has_red_child(sibling, Direction::Left)
                    && !self.has_red_child(sibling, Direction::Right)
                {
                    if let Some(up) = parent {
                        self.arena[up].color = Color::Black;
                    }
                    self.arena[sibling].color = Color::Red;
                    self.arena[next].color = Color::Red;
                } else if let Some(up) = parent {
                    let side =
                        Direction::from_bool(self.link_of(grand, Direction::Right) == Link::Child(up));
                    let rotated = if self.has_red_child(sibling, last) {
                        self.rotate_double(up, last)
                    } else {
                        self.rotate_single(up, last)
                    };
                    self.set_link_of(grand, side, Link::Child(rotated));

                    self.arena[next].color = Color::Red;
                    self.arena[rotated].color = Color::Red;
                    for side in Direction::BOTH {
                        if let Link::Child(child) = self.arena[rotated].link(side) {
                            self.arena[child].color = Color::Black;
                        }
                    }
                }
            }
        }

        (found, parent, victim)
    }

    /// Unlinks `victim` (which has at most one real child) from `parent`
    /// and moves its entry into `target` when they differ.
    ///
    /// Returns the entry that was stored in `target`.
    fn splice(&mut self, target: NodeId, parent: Option<NodeId>, victim: NodeId) -> Option<(K, V)> {
        let side = Direction::from_bool(self.link_of(parent, Direction::Right) == Link::Child(victim));
        let keep = Direction::from_bool(self.arena[victim].link(Direction::Left).is_thread());

        match self.arena[victim].link(keep) {
            Link::Child(orphan) => {
                self.set_link_of(parent, side, Link::Child(orphan));
                // The orphan's inner extreme threaded to the victim.
                let inward = keep.opposite();
                let edge = self.descend(orphan, inward);
                let thread = self.arena[victim].link(inward);
                self.arena[edge].set_link(inward, thread);
            }
            Link::Thread(_) => {
                let thread = self.arena[victim].link(side);
                self.set_link_of(parent, side, thread);
            }
        }

        let mut removed = self.arena.free(victim)?;
        if target != victim {
            let node = &mut self.arena[target];
            mem::swap(&mut node.key, &mut removed.key);
            mem::swap(&mut node.value, &mut removed.value);
        }
        self.len -= 1;
        Some((removed.key, removed.value))
    }

    /// Returns the entry immediately before `key`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `key` is absent, [`TreeError::NoMore`] if
    /// it is the smallest key, [`TreeError::Uninitialized`] if the tree is
    /// not live.
    pub fn predecessor(&self, key: &K) -> Result<(&K, &V), TreeError> {
        self.neighbor(key, Direction::Left)
    }

    /// Returns the entry immediately after `key`.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] if `key` is absent, [`TreeError::NoMore`] if
    /// it is the largest key, [`TreeError::Uninitialized`] if the tree is
    /// not live.
    pub fn successor(&self, key: &K) -> Result<(&K, &V), TreeError> {
        self.neighbor(key, Direction::Right)
    }

    /// Returns the neighbor of `key` on `direction`.
    ///
    /// # Errors
    ///
    /// As [`predecessor`](Self::predecessor) / [`successor`](Self::successor).
    pub fn neighbor(&self, key: &K, direction: Direction) -> Result<(&K, &V), TreeError> {
        self.ensure_live()?;
        let id = self.locate(key).ok_or(TreeError::NotFound)?;
        self.step(id, direction)
            .map(|neighbor| self.entry(neighbor))
            .ok_or(TreeError::NoMore)
    }

    /// Returns the entry with the smallest key.
    #[must_use]
    pub fn min(&self) -> Option<(&K, &V)> {
        self.extreme(Direction::Left).map(|id| self.entry(id))
    }

    /// Returns the entry with the largest key.
    #[must_use]
    pub fn max(&self) -> Option<(&K, &V)> {
        self.extreme(Direction::Right).map(|id| self.entry(id))
    }

    /// Samples an entry using the thread-local generator.
    ///
    /// # Errors
    ///
    /// As [`find_random_with`](Self::find_random_with).
    pub fn find_random(&self) -> Result<(&K, &V), TreeError> {
        self.find_random_with(&mut rand::thread_rng())
    }

    /// Samples an entry by a weighted random descent.
    ///
    /// A target rank is drawn from `0..len`. At every node the weight of the
    /// left subtree decides the step: a smaller target descends left, an
    /// equal one stops here, a larger one descends right after the left
    /// subtree and the node itself are taken off the target. Every entry is
    /// therefore returned with probability `1 / len`. Threads are never
    /// followed.
    ///
    /// # Errors
    ///
    /// [`TreeError::NotFound`] on an empty tree,
    /// [`TreeError::Uninitialized`] if the tree is not live.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    /// use threaded_rbtree::tree::IntTree;
    ///
    /// let mut tree = IntTree::new();
    /// for key in 0..100 {
    ///     tree.insert(key, ()).unwrap();
    /// }
    /// let mut rng = StdRng::seed_from_u64(7);
    /// let (key, _) = tree.find_random_with(&mut rng).unwrap();
    /// assert!(tree.contains_key(key));
    /// ```
    pub fn find_random_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(&K, &V), TreeError> {
        self.ensure_live()?;
        let Some(root) = self.root else {
            return Err(TreeError::NotFound);
        };

        let mut target = rng.gen_range(0..self.len);
        let mut current = root;
        loop {
            let node = &self.arena[current];
            let left = self.weight_of(node.link(Direction::Left));
            let next = match target.cmp(&left) {
                Ordering::Equal => break,
                Ordering::Less => node.link(Direction::Left),
                Ordering::Greater => {
                    target -= left + 1;
                    node.link(Direction::Right)
                }
            };
            // Only a corrupted weight can point past a leaf.
            let Link::Child(child) = next else {
                break;
            };
            current = child;
        }

        Ok(self.entry(current))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{CappedAllocator, CmpTree, IntTree};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    fn tree_of(keys: &[u64]) -> IntTree<u64> {
        let mut tree = IntTree::new();
        for &key in keys {
            tree.insert(key, key * 10).unwrap();
        }
        tree
    }

    #[rstest]
    fn test_first_insert_creates_black_root() {
        let tree = tree_of(&[42]);
        let root = tree.root.unwrap();
        assert_eq!(tree.arena[root].color, Color::Black);
        assert_eq!(tree.arena[root].link(Direction::Left), Link::Thread(None));
        assert_eq!(tree.arena[root].link(Direction::Right), Link::Thread(None));
    }

    #[rstest]
    fn test_new_leaf_threads_to_parent_and_inherited_neighbor() {
        let tree = tree_of(&[20, 10, 30, 15]);
        let fifteen = tree.locate(&15).unwrap();
        let ten = tree.locate(&10).unwrap();
        let twenty = tree.locate(&20).unwrap();
        assert_eq!(tree.arena[fifteen].link(Direction::Left), Link::Thread(Some(ten)));
        assert_eq!(tree.arena[fifteen].link(Direction::Right), Link::Thread(Some(twenty)));
        assert!(tree.validate().is_ok());
    }

    #[rstest]
    fn test_ascending_inserts_stay_balanced() {
        let keys: Vec<u64> = (0..256).collect();
        let tree = tree_of(&keys);
        assert_eq!(tree.len(), 256);
        assert!(tree.validate().is_ok());
    }

    #[rstest]
    fn test_duplicate_insert_leaves_tree_untouched() {
        let mut tree = tree_of(&[5, 3, 8]);
        let serial = tree.serial();
        let error = tree.insert(3, 999).unwrap_err();
        assert_eq!(error.kind(), TreeError::AlreadyExists);
        assert_eq!(tree.serial(), serial);
        assert_eq!(tree.find(&3), Ok(&30));
    }

    #[rstest]
    fn test_refused_allocation_leaves_tree_untouched() {
        let mut tree = IntTree::<(), CappedAllocator>::new_in(NaturalOrder, CappedAllocator::new(3));
        for key in [1_u64, 2, 3] {
            tree.insert(key, ()).unwrap();
        }
        let serial = tree.serial();
        let error = tree.insert(4, ()).unwrap_err();
        assert_eq!(error.kind(), TreeError::NoMemory);
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.serial(), serial);
        assert!(tree.validate().is_ok());

        tree.remove(&2).unwrap();
        assert_eq!(tree.allocator().live(), 2);
        assert!(tree.insert(4, ()).is_ok());
    }

    #[rstest]
    #[case(&[1], 1)]
    #[case(&[5, 3, 8, 1, 4, 7, 9], 5)]
    #[case(&[5, 3, 8, 1, 4, 7, 9], 1)]
    #[case(&[5, 3, 8, 1, 4, 7, 9], 9)]
    #[case(&[5, 3, 8, 1, 4, 7, 9], 3)]
    fn test_remove_keeps_invariants(#[case] keys: &[u64], #[case] doomed: u64) {
        let mut tree = tree_of(keys);
        assert_eq!(tree.remove(&doomed), Ok((doomed, doomed * 10)));
        assert_eq!(tree.len(), keys.len() - 1);
        assert_eq!(tree.find(&doomed), Err(TreeError::NotFound));
        assert!(tree.validate().is_ok());
        for &key in keys.iter().filter(|&&key| key != doomed) {
            assert_eq!(tree.find(&key), Ok(&(key * 10)));
        }
    }

    #[rstest]
    fn test_remove_absent_key_changes_nothing() {
        let mut tree = tree_of(&[2, 4, 6]);
        let serial = tree.serial();
        assert_eq!(tree.remove(&5), Err(TreeError::NotFound));
        assert_eq!(tree.serial(), serial);
        assert_eq!(tree.len(), 3);
    }

    #[rstest]
    fn test_remove_certain_on_absent_key_stays_valid() {
        let keys: Vec<u64> = (0..64).map(|key| key * 2).collect();
        let mut tree = tree_of(&keys);
        assert_eq!(tree.remove_certain(&33), Err(TreeError::NotFound));
        assert_eq!(tree.len(), 64);
        assert!(tree.validate().is_ok());
    }

    #[rstest]
    fn test_remove_until_empty() {
        let keys: Vec<u64> = (0..100).map(|key| (key * 37) % 100).collect();
        let mut tree = tree_of(&keys);
        for key in &keys {
            tree.remove(key).unwrap();
            assert!(tree.validate().is_ok());
        }
        assert!(tree.is_empty());
        assert!(tree.root.is_none());
    }

    #[rstest]
    fn test_neighbors() {
        let tree = tree_of(&[5, 3, 8, 1, 4, 7, 9]);
        assert_eq!(tree.predecessor(&5), Ok((&4, &40)));
        assert_eq!(tree.successor(&5), Ok((&7, &70)));
        assert_eq!(tree.predecessor(&1), Err(TreeError::NoMore));
        assert_eq!(tree.successor(&9), Err(TreeError::NoMore));
        assert_eq!(tree.successor(&6), Err(TreeError::NotFound));
        assert_eq!(tree.min(), Some((&1, &10)));
        assert_eq!(tree.max(), Some((&9, &90)));
    }

    #[rstest]
    fn test_locate_beyond() {
        let tree = tree_of(&[10, 20, 30]);
        let key_of = |id: Option<NodeId>| id.map(|id| *tree.entry(id).0);
        assert_eq!(key_of(tree.locate_beyond(&20, Direction::Right)), Some(30));
        assert_eq!(key_of(tree.locate_beyond(&15, Direction::Right)), Some(20));
        assert_eq!(key_of(tree.locate_beyond(&30, Direction::Right)), None);
        assert_eq!(key_of(tree.locate_beyond(&20, Direction::Left)), Some(10));
        assert_eq!(key_of(tree.locate_beyond(&10, Direction::Left)), None);
    }

    #[rstest]
    fn test_find_random_returns_present_keys() {
        let tree = tree_of(&(0..500).collect::<Vec<_>>());
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..1000 {
            let (key, value) = tree.find_random_with(&mut rng).unwrap();
            assert_eq!(*value, key * 10);
        }
    }

    #[rstest]
    fn test_weights_follow_inserts_and_removes() {
        let mut tree = tree_of(&(0..64).collect::<Vec<_>>());
        let root_weight =
            |tree: &IntTree<u64>| tree.root.map_or(0, |root| tree.arena[root].weight);
        assert_eq!(root_weight(&tree), 64);
        for key in (0..64).filter(|key| key % 3 == 0) {
            tree.remove(&key).unwrap();
            assert_eq!(root_weight(&tree), tree.len());
        }
        assert_eq!(tree.remove_certain(&3), Err(TreeError::NotFound));
        assert_eq!(root_weight(&tree), tree.len());
        assert!(tree.validate().is_ok());
    }

    #[rstest]
    fn test_find_random_rank_zero_is_the_minimum() {
        let tree = tree_of(&[5, 3, 8, 1, 4, 7, 9]);
        let mut zero = rand::rngs::mock::StepRng::new(0, 0);
        assert_eq!(tree.find_random_with(&mut zero), Ok((&1, &10)));
    }

    #[rstest]
    fn test_find_random_on_empty_tree() {
        let tree: IntTree<()> = IntTree::new();
        assert_eq!(tree.find_random(), Err(TreeError::NotFound));
    }

    #[rstest]
    fn test_uninitialized_tree_rejects_operations() {
        let mut tree: IntTree<u64> = IntTree::uninit();
        assert!(!tree.is_initialized());
        assert_eq!(tree.find(&1), Err(TreeError::Uninitialized));
        assert_eq!(tree.insert(1, 1).unwrap_err().kind(), TreeError::Uninitialized);
        assert_eq!(tree.remove(&1), Err(TreeError::Uninitialized));
        assert_eq!(tree.successor(&1), Err(TreeError::Uninitialized));
        assert_eq!(tree.find_random(), Err(TreeError::Uninitialized));
        assert_eq!(tree.destroy(Disposal::Drop), Err(TreeError::Uninitialized));

        tree.init().unwrap();
        assert_eq!(tree.init(), Err(TreeError::AlreadyInitialized));
        assert!(tree.insert(1, 1).is_ok());
    }

    #[rstest]
    fn test_destroy_releases_entries_in_order() {
        let mut tree = CmpTree::with_comparator(|left: &String, right: &String| left.cmp(right));
        for name in ["gamma", "alpha", "beta"] {
            tree.insert(name.to_string(), name.len()).unwrap();
        }
        let mut released = Vec::new();
        tree.destroy(Disposal::Entries(&mut |key, value| released.push((key, value))))
            .unwrap();
        assert_eq!(
            released,
            vec![
                ("alpha".to_string(), 5),
                ("beta".to_string(), 4),
                ("gamma".to_string(), 5)
            ]
        );
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.find(&"alpha".to_string()), Err(TreeError::Uninitialized));
    }

    #[rstest]
    fn test_observers_see_neighbors() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut tree = tree_of(&[10, 30]);

        let sink = Arc::clone(&seen);
        tree.set_insert_observer(move |entry| {
            sink.lock().unwrap().push((
                "insert",
                *entry.key,
                entry.predecessor.map(|(key, _)| *key),
                entry.successor.map(|(key, _)| *key),
            ));
        });
        let sink = Arc::clone(&seen);
        tree.set_remove_observer(move |entry| {
            sink.lock().unwrap().push((
                "remove",
                *entry.key,
                entry.predecessor.map(|(key, _)| *key),
                entry.successor.map(|(key, _)| *key),
            ));
        });

        tree.insert(20, 200).unwrap();
        tree.remove(&10).unwrap();
        tree.insert(40, 400).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("insert", 20, Some(10), Some(30)),
                ("remove", 10, None, Some(20)),
                ("insert", 40, Some(30), None),
            ]
        );
    }
}
