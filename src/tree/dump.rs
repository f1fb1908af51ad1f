//! Debug rendering.
//!
//! [`RbTree::dump`] draws the tree sideways: the largest key on the first
//! line, one node per line, indentation by depth. Every line shows the
//! node's color, and every side that holds a thread shows where it leads.
//!
//! ```text
//!         9 => 90 [R] L~8 R~nil
//!     8 => 80 [B]
//!         7 => 70 [R] L~5 R~8
//! 5 => 50 [B]
//! ```

use std::fmt::{self, Write};

use smallvec::SmallVec;

use super::engine::RbTree;
use super::node::{Color, Direction, Link, NodeId};

const INDENT: &str = "    ";

impl<K: fmt::Debug, V: fmt::Debug, C, A> RbTree<K, V, C, A> {
    /// Writes the sideways rendering of the tree into `out`.
    ///
    /// # Errors
    ///
    /// Propagates the errors of `out`.
    pub fn dump<W: Write>(&self, out: &mut W) -> fmt::Result {
        if !self.is_initialized() {
            return writeln!(out, "<uninitialized>");
        }
        if self.root.is_none() {
            return writeln!(out, "<empty>");
        }

        let mut pending: SmallVec<[(NodeId, usize); 64]> = SmallVec::new();
        let mut current = self.root.map(|root| (root, 0));
        loop {
            while let Some((id, depth)) = current {
                pending.push((id, depth));
                current = self.arena[id]
                    .link(Direction::Right)
                    .child()
                    .map(|child| (child, depth + 1));
            }
            let Some((id, depth)) = pending.pop() else {
                break;
            };
            self.dump_line(out, id, depth)?;
            current = self.arena[id]
                .link(Direction::Left)
                .child()
                .map(|child| (child, depth + 1));
        }
        Ok(())
    }

    fn dump_line<W: Write>(&self, out: &mut W, id: NodeId, depth: usize) -> fmt::Result {
        let node = &self.arena[id];
        for _ in 0..depth {
            out.write_str(INDENT)?;
        }
        let color = match node.color {
            Color::Red => 'R',
            Color::Black => 'B',
        };
        write!(out, "{:?} => {:?} [{color}]", node.key, node.value)?;
        for side in Direction::BOTH {
            let Link::Thread(target) = node.link(side) else {
                continue;
            };
            let marker = match side {
                Direction::Left => 'L',
                Direction::Right => 'R',
            };
            match target {
                Some(neighbor) => write!(out, " {marker}~{:?}", self.arena[neighbor].key)?,
                None => write!(out, " {marker}~nil")?,
            }
        }
        out.write_char('\n')
    }

    /// Returns the sideways rendering as a string.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use threaded_rbtree::tree::IntTree;
    ///
    /// let mut tree = IntTree::new();
    /// for key in [2, 1, 3] {
    ///     tree.insert(key, ()).unwrap();
    /// }
    /// assert_eq!(
    ///     tree.dump_string(),
    ///     "    3 => () [R] L~2 R~nil\n2 => () [B]\n    1 => () [R] L~nil R~2\n"
    /// );
    /// ```
    #[must_use]
    pub fn dump_string(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.dump(&mut out);
        out
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C, A> fmt::Debug for RbTree<K, V, C, A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display, C, A> fmt::Display for RbTree<K, V, C, A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for (key, value) in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        write!(formatter, "}}")
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::{Disposal, IntTree};
    use rstest::rstest;

    #[rstest]
    fn test_dump_marks_colors_and_threads() {
        let mut tree = IntTree::new();
        for key in [5, 3, 8, 1, 4, 7, 9] {
            tree.insert(key, key * 10).unwrap();
        }
        let dump = tree.dump_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].trim_start().starts_with("9 => 90"));
        assert!(lines[0].ends_with("R~nil"));
        assert!(lines[6].trim_start().starts_with("1 => 10"));
        assert!(lines[6].contains("L~nil"));
        let root = lines.iter().find(|line| !line.starts_with(' ')).unwrap();
        assert_eq!(*root, "5 => 50 [B]");
    }

    #[rstest]
    fn test_dump_of_empty_and_destroyed_trees() {
        let mut tree: IntTree<u64> = IntTree::new();
        assert_eq!(tree.dump_string(), "<empty>\n");
        tree.destroy(Disposal::Drop).unwrap();
        assert_eq!(tree.dump_string(), "<uninitialized>\n");
    }

    #[rstest]
    fn test_display_and_debug() {
        let mut tree = IntTree::new();
        assert_eq!(format!("{tree}"), "{}");
        tree.insert(2, "two").unwrap();
        tree.insert(1, "one").unwrap();
        assert_eq!(format!("{tree}"), "{1: one, 2: two}");
        assert_eq!(format!("{tree:?}"), r#"{1: "one", 2: "two"}"#);
    }
}
