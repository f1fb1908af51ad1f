//! Node representation.
//!
//! A node owns its key and value and has two link slots. Each slot is
//! either a real child or a thread to the in-order neighbor on that side;
//! the [`Link`] enum makes "both" and "neither" unrepresentable.

/// Index of a node inside the tree's arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub(crate) struct NodeId(usize);

impl NodeId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) const fn index(self) -> usize {
        self.0
    }
}

/// The color of a node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Color {
    /// Red node.
    Red,
    /// Black node.
    Black,
}

/// A side of a node, or a traversal direction.
///
/// `Left` walks towards smaller keys, `Right` towards larger keys.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Direction {
    /// Towards smaller keys (descending order).
    Left,
    /// Towards larger keys (ascending order).
    Right,
}

impl Direction {
    /// Both sides, left first.
    pub const BOTH: [Self; 2] = [Self::Left, Self::Right];

    /// Returns the other side.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    /// `Right` when `right` is true.
    #[inline]
    pub(crate) const fn from_bool(right: bool) -> Self {
        if right { Self::Right } else { Self::Left }
    }
}

/// One side of a node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Link {
    /// A real child.
    Child(NodeId),
    /// The in-order neighbor on this side, `None` at a tree extreme.
    Thread(Option<NodeId>),
}

impl Link {
    #[inline]
    pub(crate) const fn child(self) -> Option<NodeId> {
        match self {
            Self::Child(id) => Some(id),
            Self::Thread(_) => None,
        }
    }

    #[inline]
    pub(crate) const fn is_thread(self) -> bool {
        matches!(self, Self::Thread(_))
    }
}

pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) color: Color,
    /// Number of nodes in the subtree rooted here, this one included.
    pub(crate) weight: usize,
    links: [Link; 2],
}

impl<K, V> Node<K, V> {
    /// Creates a new red node threaded to nothing on both sides.
    pub(crate) const fn new(key: K, value: V) -> Self {
        Self {
            key,
            value,
            color: Color::Red,
            weight: 1,
            links: [Link::Thread(None), Link::Thread(None)],
        }
    }

    #[inline]
    pub(crate) const fn link(&self, direction: Direction) -> Link {
        self.links[direction.index()]
    }

    #[inline]
    pub(crate) const fn set_link(&mut self, direction: Direction, link: Link) {
        self.links[direction.index()] = link;
    }

    #[inline]
    pub(crate) fn is_red(&self) -> bool {
        self.color == Color::Red
    }
}
