use std::collections::HashSet;

use bptree_kv::{BTreeConfig, Tree};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn insert_range(tree: &mut Tree<bptree_kv::InMemoryPageStore<usize>>, range: std::ops::Range<usize>) {
    for i in range {
        tree.insert(i as u64, i).unwrap();
    }
}

fn check_range(tree: &mut Tree<bptree_kv::InMemoryPageStore<usize>>, range: std::ops::Range<usize>) {
    for i in range {
        let cursor = tree.find(i as u64).unwrap();
        let value = *cursor.value(tree.store_mut()).unwrap();
        assert_eq!(value, i);
    }
}

/// A deterministic shuffle of `0..n` (no `rand` dependency): walks the
/// range via a fixed stride coprime with every `n` used in these tests.
fn shuffled(n: usize) -> Vec<usize> {
    let stride = 7919usize;
    (0..n).map(|i| (i * stride) % n).collect()
}

#[test]
fn rejects_duplicate_keys() {
    let mut tree = Tree::new();
    tree.insert(1, "a").unwrap();
    let err = tree.insert(1, "b").unwrap_err();
    assert!(matches!(err, bptree_kv::Error::DuplicateKey));
}

#[test]
fn fills_a_single_leaf_without_splitting() {
    let config = BTreeConfig::new(8, 4);
    let mut tree = Tree::with_config(config);
    insert_range(&mut tree, 0..8);
    check_range(&mut tree, 0..8);

    let printed = tree.print().unwrap();
    assert_eq!(printed.lines().next().unwrap(), "- leaf (size 8)");
}

#[test]
fn splits_a_leaf_once_it_overflows() {
    let config = BTreeConfig::new(8, 4);
    let mut tree = Tree::with_config(config);
    insert_range(&mut tree, 0..9);
    check_range(&mut tree, 0..9);

    let printed = tree.print().unwrap();
    let mut lines = printed.lines();
    assert!(lines.next().unwrap().starts_with("- internal"));
    // Two leaves under the new root, separated by exactly one key line.
    let leaf_lines: Vec<_> = printed.lines().filter(|l| l.trim_start().starts_with("- leaf")).collect();
    assert_eq!(leaf_lines.len(), 2);
}

#[test]
fn scans_in_ascending_order_after_shuffled_inserts() {
    let config = BTreeConfig::new(8, 4);
    let mut tree = Tree::with_config(config);
    let n = 200;
    for i in shuffled(n) {
        tree.insert(i as u64, i).unwrap();
    }

    let scanned: Vec<_> = tree.scan().unwrap().map(|r| r.unwrap()).collect();
    let keys: Vec<_> = scanned.iter().map(|(k, _)| *k).collect();
    let mut sorted_keys = keys.clone();
    sorted_keys.sort_unstable();
    assert_eq!(keys, sorted_keys);

    let values: HashSet<_> = scanned.into_iter().map(|(_, v)| v).collect();
    let expected: HashSet<_> = (0..n).collect();
    assert_eq!(values, expected);
}

#[test]
fn grows_multiple_levels_and_stays_queryable() {
    init_tracing();
    // Small fanouts to force several internal splits within a modest key count.
    let config = BTreeConfig::new(4, 3);
    let mut tree = Tree::with_config(config);
    let n = 300;
    for i in shuffled(n) {
        tree.insert(i as u64, i).unwrap();
    }
    check_range(&mut tree, 0..n);

    let printed = tree.print().unwrap();
    assert!(printed.lines().next().unwrap().starts_with("- internal"));

    let scanned: Vec<_> = tree.scan().unwrap().map(|r| r.unwrap().0).collect();
    let mut sorted = scanned.clone();
    sorted.sort_unstable();
    assert_eq!(scanned, sorted);
    assert_eq!(scanned.len(), n);
}

#[test]
fn cursor_advances_across_leaf_boundaries_to_end_of_table() {
    let config = BTreeConfig::new(4, 4);
    let mut tree = Tree::with_config(config);
    insert_range(&mut tree, 0..50);

    let mut cursor = tree.start().unwrap();
    let mut seen = Vec::new();
    loop {
        let value = *cursor.value(tree.store_mut()).unwrap();
        seen.push(value);
        cursor.advance(tree.store_mut()).unwrap();
        if cursor.end_of_table {
            break;
        }
    }
    assert_eq!(seen, (0..50).collect::<Vec<_>>());
}

#[test]
fn separators_match_each_childs_actual_maximum_key() {
    let config = BTreeConfig::new(4, 3);
    let mut tree = Tree::with_config(config);
    let n = 120;
    for i in shuffled(n) {
        tree.insert(i as u64, i).unwrap();
    }

    // Every key lookup must land in a leaf that actually holds it at the
    // position find() reports, which only holds if every separator on the
    // path reflects its child's true maximum.
    for i in 0..n {
        let cursor = tree.find(i as u64).unwrap();
        let value = *cursor.value(tree.store_mut()).unwrap();
        assert_eq!(value, i);
    }
}
