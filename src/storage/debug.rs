//! Pretty-printer for the tree, used by acceptance tests and ad-hoc
//! debugging. Grounded on the host crate's recursive `debug_node`/
//! `print_with_indent` helpers (`storage::table::build_btree` plays a
//! similar role, flattening the tree into rows for display), reshaped to
//! match the exact indentation format this engine's tests assert on.

use std::fmt::Write as _;

use crate::errors::Error;
use crate::storage::page_store::{Node, PageId, PageStore};

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

/// Appends the pretty-printed subtree rooted at `id` to `out`.
pub fn print_node<S: PageStore>(
    store: &mut S,
    id: PageId,
    level: usize,
    out: &mut String,
) -> Result<(), Error> {
    match store.get(id) {
        Node::Leaf(leaf) => {
            let keys: Vec<_> = leaf.cells.iter().map(|(k, _)| *k).collect();
            let _ = writeln!(out, "{}- leaf (size {})", indent(level), keys.len());
            for key in keys {
                let _ = writeln!(out, "{}- {}", indent(level + 1), key);
            }
        }
        Node::Internal(internal) => {
            let cells = internal.cells.clone();
            let right_child = internal.right_child;
            let _ = writeln!(out, "{}- internal (size {})", indent(level), cells.len());
            for (child, sep) in cells {
                print_node(store, child, level + 1, out)?;
                let _ = writeln!(out, "{}- key {}", indent(level + 1), sep);
            }
            if let Some(right_child) = right_child {
                print_node(store, right_child, level + 1, out)?;
            }
        }
    }
    Ok(())
}
