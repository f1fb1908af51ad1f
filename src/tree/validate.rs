//! Structural validation.
//!
//! [`RbTree::validate`] walks the whole tree and checks every red-black,
//! ordering and threading invariant. It is meant for tests and debug
//! builds: it costs O(N) and recurses once per level.

use std::cmp::Ordering;
use std::fmt;

use super::allocator::NodeAllocator;
use super::comparator::KeyComparator;
use super::engine::RbTree;
use super::error::TreeError;
use super::node::{Color, Direction, Link, NodeId};

/// Deepest level the validator descends to before giving up.
const MAX_VALIDATE_DEPTH: usize = 100;

/// The invariant a corrupted tree breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// The tree is deeper than the validator is willing to recurse.
    DepthExceeded,
    /// A child link names a node that does not exist.
    DanglingLink,
    /// The root is red.
    RedRoot,
    /// A red node has a red child.
    ConsecutiveRed,
    /// A key is out of order with respect to an ancestor.
    OrderViolation,
    /// Two paths from the same node cross different numbers of black nodes.
    BlackHeightMismatch,
    /// A thread does not name the in-order neighbor on its side.
    ThreadMismatch,
    /// The comparator does not reverse when its arguments are swapped.
    ComparatorNotAntisymmetric,
    /// The comparator orders two children inconsistently with their parent.
    ComparatorNotTransitive,
    /// The entry count does not match the number of reachable nodes.
    SizeMismatch,
    /// A node's subtree weight does not match the nodes below it.
    WeightMismatch,
}

impl fmt::Display for Violation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::DepthExceeded => "tree deeper than the validation limit",
            Self::DanglingLink => "child link names a missing node",
            Self::RedRoot => "root is red",
            Self::ConsecutiveRed => "red node has a red child",
            Self::OrderViolation => "keys out of order",
            Self::BlackHeightMismatch => "black heights differ",
            Self::ThreadMismatch => "thread does not name the in-order neighbor",
            Self::ComparatorNotAntisymmetric => "comparator is not antisymmetric",
            Self::ComparatorNotTransitive => "comparator is not transitive",
            Self::SizeMismatch => "entry count does not match reachable nodes",
            Self::WeightMismatch => "subtree weight does not match its node count",
        };
        formatter.write_str(message)
    }
}

/// Exclusive key bounds of a subtree. The bounding nodes are also the
/// targets the subtree's outermost threads must name.
#[derive(Clone, Copy)]
struct Bounds {
    low: Option<NodeId>,
    high: Option<NodeId>,
}

/// What a checked subtree reports to its parent.
#[derive(Clone, Copy, Default)]
struct Subtree {
    black_height: usize,
    weight: usize,
}

impl<K, V, C: KeyComparator<K>, A: NodeAllocator> RbTree<K, V, C, A> {
    /// Checks every structural invariant.
    ///
    /// # Errors
    ///
    /// [`TreeError::Corrupted`] naming the first broken invariant found,
    /// [`TreeError::Uninitialized`] if the tree is not live.
    pub fn validate(&self) -> Result<(), TreeError> {
        self.ensure_live()?;
        self.check_tree().map_err(|violation| {
            tracing::warn!(%violation, len = self.len, "tree validation failed");
            TreeError::Corrupted(violation)
        })
    }

    fn check_tree(&self) -> Result<(), Violation> {
        if let Some(root) = self.root {
            let node = self.arena.get(root).ok_or(Violation::DanglingLink)?;
            if node.color == Color::Red {
                return Err(Violation::RedRoot);
            }
        }
        let whole = Bounds {
            low: None,
            high: None,
        };
        let root = match self.root {
            Some(root) => Link::Child(root),
            None => Link::Thread(None),
        };
        // An empty root slot must hold `Thread(None)`.
        let checked = self.check_link(root, Direction::Left, whole, 0)?;
        if checked.weight != self.len || self.arena.len() != self.len {
            return Err(Violation::SizeMismatch);
        }
        Ok(())
    }

    /// Checks the subtree behind `link` (the `side` slot of its parent).
    fn check_link(
        &self,
        link: Link,
        side: Direction,
        bounds: Bounds,
        depth: usize,
    ) -> Result<Subtree, Violation> {
        let id = match link {
            Link::Thread(target) => {
                let expected = match side {
                    Direction::Left => bounds.low,
                    Direction::Right => bounds.high,
                };
                return if target == expected {
                    Ok(Subtree::default())
                } else {
                    Err(Violation::ThreadMismatch)
                };
            }
            Link::Child(id) => id,
        };
        if depth >= MAX_VALIDATE_DEPTH {
            return Err(Violation::DepthExceeded);
        }
        let node = self.arena.get(id).ok_or(Violation::DanglingLink)?;

        let mut children = [None, None];
        for side in Direction::BOTH {
            if let Link::Child(child) = node.link(side) {
                let child_node = self.arena.get(child).ok_or(Violation::DanglingLink)?;
                if node.is_red() && child_node.is_red() {
                    return Err(Violation::ConsecutiveRed);
                }
                children[side.index()] = Some(&child_node.key);
            }
        }

        if !self.comparator.is_natural() {
            for child in children.into_iter().flatten() {
                let forward = self.comparator.compare(&node.key, child);
                let backward = self.comparator.compare(child, &node.key);
                if forward != backward.reverse() {
                    return Err(Violation::ComparatorNotAntisymmetric);
                }
            }
            if let [Some(left), Some(right)] = children
                && self.comparator.compare(left, right) != Ordering::Less
            {
                return Err(Violation::ComparatorNotTransitive);
            }
        }

        let above_low = bounds.low.is_none_or(|low| {
            self.arena
                .get(low)
                .is_some_and(|low| self.comparator.compare(&low.key, &node.key) == Ordering::Less)
        });
        let below_high = bounds.high.is_none_or(|high| {
            self.arena
                .get(high)
                .is_some_and(|high| self.comparator.compare(&node.key, &high.key) == Ordering::Less)
        });
        if !above_low || !below_high {
            return Err(Violation::OrderViolation);
        }

        let left = self.check_link(
            node.link(Direction::Left),
            Direction::Left,
            Bounds {
                low: bounds.low,
                high: Some(id),
            },
            depth + 1,
        )?;
        let right = self.check_link(
            node.link(Direction::Right),
            Direction::Right,
            Bounds {
                low: Some(id),
                high: bounds.high,
            },
            depth + 1,
        )?;
        if left.black_height != right.black_height {
            return Err(Violation::BlackHeightMismatch);
        }
        let weight = 1 + left.weight + right.weight;
        if node.weight != weight {
            return Err(Violation::WeightMismatch);
        }
        Ok(Subtree {
            black_height: left.black_height + usize::from(node.color == Color::Black),
            weight,
        })
    }
}
