//! Property-based tests for the threaded red-black tree.
//!
//! Every law is checked against `std::collections::BTreeMap` as the model,
//! and every mutated tree must pass the structural validator.

use std::collections::BTreeMap;
use std::ops::Bound;

use proptest::prelude::*;
use threaded_rbtree::tree::{Direction, IntTree, TreeError};

#[derive(Debug, Clone)]
enum Operation {
    Insert(u64, u32),
    Remove(u64),
    RemoveCertain(u64),
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (0..200_u64, any::<u32>()).prop_map(|(key, value)| Operation::Insert(key, value)),
        2 => (0..200_u64).prop_map(Operation::Remove),
        1 => (0..200_u64).prop_map(Operation::RemoveCertain),
    ]
}

fn build(entries: &[(u64, u32)]) -> (IntTree<u32>, BTreeMap<u64, u32>) {
    let mut tree = IntTree::new();
    let mut model = BTreeMap::new();
    for &(key, value) in entries {
        if tree.insert(key, value).is_ok() {
            model.insert(key, value);
        }
    }
    (tree, model)
}

// =============================================================================
// Model Laws
// =============================================================================

proptest! {
    /// Law: any sequence of operations leaves a valid tree equal to the model.
    #[test]
    fn prop_operations_match_model(operations in prop::collection::vec(operation(), 0..300)) {
        let mut tree = IntTree::new();
        let mut model = BTreeMap::new();
        for operation in operations {
            match operation {
                Operation::Insert(key, value) => {
                    let inserted = tree.insert(key, value).is_ok();
                    prop_assert_eq!(inserted, !model.contains_key(&key));
                    model.entry(key).or_insert(value);
                }
                Operation::Remove(key) => {
                    prop_assert_eq!(tree.remove(&key).ok(), model.remove(&key).map(|value| (key, value)));
                }
                Operation::RemoveCertain(key) => {
                    let expected = model.remove(&key).map(|value| (key, value)).ok_or(TreeError::NotFound);
                    prop_assert_eq!(tree.remove_certain(&key), expected);
                }
            }
            prop_assert!(tree.validate().is_ok());
        }
        prop_assert_eq!(tree.len(), model.len());
        let entries: Vec<(u64, u32)> = tree.iter().map(|(key, value)| (*key, *value)).collect();
        let expected: Vec<(u64, u32)> = model.into_iter().collect();
        prop_assert_eq!(entries, expected);
    }

    /// Law: successor and predecessor agree with the model's ordering.
    #[test]
    fn prop_neighbors_match_model(entries in prop::collection::vec((any::<u64>(), any::<u32>()), 1..100)) {
        let (tree, model) = build(&entries);
        for &key in model.keys() {
            let successor = tree.successor(&key).ok().map(|(key, _)| *key);
            let expected = model.range((Bound::Excluded(key), Bound::Unbounded)).next().map(|(key, _)| *key);
            prop_assert_eq!(successor, expected);
            let predecessor = tree.predecessor(&key).ok().map(|(key, _)| *key);
            let expected = model.range(..key).next_back().map(|(key, _)| *key);
            prop_assert_eq!(predecessor, expected);
        }
    }

    /// Law: a descending cursor visits exactly the reversed ascending order.
    #[test]
    fn prop_cursor_directions_are_mirrored(entries in prop::collection::vec((any::<u64>(), any::<u32>()), 0..100)) {
        let (tree, _) = build(&entries);
        let mut descending = Vec::new();
        let mut cursor = tree.cursor(Direction::Left);
        while let Ok((key, _)) = cursor.next(&tree) {
            descending.push(*key);
        }
        descending.reverse();
        let ascending: Vec<u64> = tree.keys().copied().collect();
        prop_assert_eq!(descending, ascending);
    }

    /// Law: a clone is structurally identical and independent.
    #[test]
    fn prop_clone_is_identical(entries in prop::collection::vec((0..1000_u64, any::<u32>()), 0..100)) {
        let (tree, _) = build(&entries);
        let copy = tree.try_clone().unwrap();
        prop_assert_eq!(copy.dump_string(), tree.dump_string());
        prop_assert!(copy.validate().is_ok());
    }

    /// Law: random sampling always returns a present entry.
    #[test]
    fn prop_find_random_returns_member(entries in prop::collection::vec((any::<u64>(), any::<u32>()), 1..100)) {
        let (tree, model) = build(&entries);
        let (key, value) = tree.find_random().unwrap();
        prop_assert_eq!(model.get(key), Some(value));
    }

    /// Law: the serial never moves on a read-only operation.
    #[test]
    fn prop_reads_keep_serial(entries in prop::collection::vec((any::<u64>(), any::<u32>()), 0..50), lookup: u64) {
        let (tree, _) = build(&entries);
        let serial = tree.serial();
        let _ = tree.find(&lookup);
        let _ = tree.successor(&lookup);
        let _ = tree.cursor_after(&lookup);
        let _ = tree.find_random();
        prop_assert!(tree.validate().is_ok());
        prop_assert_eq!(tree.serial(), serial);
    }
}
