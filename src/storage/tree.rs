//! The tree itself: ordered lookup, insertion with split-and-promote, and
//! full scans.
//!
//! Grounded on the host crate's `storage::table` free functions
//! (`insert_row`, `leaf_node_split_and_insert`,
//! `internal_node_split_and_insert`, `internal_node_insert`,
//! `create_new_root`), folded into methods on a single `Tree<S>` that owns
//! its `PageStore` instead of threading a `Pager` and `Table` through every
//! call.

use tracing::{debug, trace, warn};

use crate::config::BTreeConfig;
use crate::errors::{err, Error};
use crate::storage::cursor::Cursor;
use crate::storage::page_store::{max_key, InMemoryPageStore, InternalNode, Key, LeafNode, Node, PageId, PageStore};

/// A single-table ordered index over `Key -> S::Value`, backed by a
/// `PageStore`. Page 0 is always the root.
pub struct Tree<S: PageStore> {
    store: S,
    config: BTreeConfig,
}

impl<V> Tree<InMemoryPageStore<V>> {
    /// A fresh tree over the default in-memory store and default fanout.
    pub fn new() -> Self {
        Self::with_config(BTreeConfig::default())
    }

    /// A fresh tree over the default in-memory store with custom fanout.
    pub fn with_config(config: BTreeConfig) -> Self {
        Self::with_store(InMemoryPageStore::new(), config)
    }
}

impl<V> Default for Tree<InMemoryPageStore<V>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: PageStore> Tree<S> {
    /// Builds a tree over a caller-supplied store, initializing page 0 as
    /// an empty root leaf.
    pub fn with_store(mut store: S, config: BTreeConfig) -> Self {
        store.put(0, Node::Leaf(LeafNode::empty(true, None)));
        Self { store, config }
    }

    pub fn config(&self) -> BTreeConfig {
        self.config
    }

    /// Direct access to the backing store, for callers that need to
    /// inspect pages outside the tree's own API (debug printing, tests).
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Renders the tree's structure, one node per line, for tests and
    /// ad-hoc inspection.
    pub fn print(&mut self) -> Result<String, Error> {
        let mut out = String::new();
        crate::storage::debug::print_node(&mut self.store, 0, 0, &mut out)?;
        Ok(out)
    }

    /// Descends from the root to the leaf that would contain `key`,
    /// returning a cursor at the position `key` occupies or would occupy.
    pub fn find(&mut self, key: Key) -> Result<Cursor, Error> {
        let mut page_id = 0;
        loop {
            match self.store.get(page_id) {
                Node::Internal(internal) => {
                    page_id = internal.child_for(key)?;
                }
                Node::Leaf(leaf) => {
                    let idx = leaf.find(key);
                    return Ok(Cursor::new(page_id, idx, false));
                }
            }
        }
    }

    /// A cursor at the first cell of the leftmost leaf.
    pub fn start(&mut self) -> Result<Cursor, Error> {
        let mut page_id = 0;
        loop {
            match self.store.get(page_id) {
                Node::Internal(internal) => {
                    page_id = match internal.cells.first() {
                        Some((child, _)) => *child,
                        None => internal.right_child.ok_or_else(|| {
                            err!(InvariantViolation, "empty internal node at page {}", page_id)
                        })?,
                    };
                }
                Node::Leaf(leaf) => {
                    let end_of_table = leaf.cells.is_empty();
                    return Ok(Cursor::new(page_id, 0, end_of_table));
                }
            }
        }
    }

    /// Inserts `key`/`value`, rejecting keys already present.
    pub fn insert(&mut self, key: Key, value: S::Value) -> Result<(), Error> {
        let cursor = self.find(key)?;
        let duplicate = {
            let leaf = self
                .store
                .get(cursor.page_id())
                .as_leaf()
                .ok_or_else(|| err!(InvariantViolation, "find() returned a non-leaf cursor"))?;
            leaf.cells
                .get(cursor.cell_index())
                .is_some_and(|(k, _)| *k == key)
        };
        if duplicate {
            return Err(Error::DuplicateKey);
        }
        debug!(key, "inserting");
        self.leaf_insert(&cursor, key, value)
    }

    /// An iterator over `(key, value)` pairs in ascending order, starting
    /// from the leftmost leaf. Not restartable: build a new one to scan
    /// again.
    pub fn scan(&mut self) -> Result<Scan<'_, S>, Error>
    where
        S::Value: Clone,
    {
        let cursor = self.start()?;
        Ok(Scan {
            store: &mut self.store,
            cursor,
        })
    }

    fn leaf_insert(&mut self, cursor: &Cursor, key: Key, value: S::Value) -> Result<(), Error> {
        let full = {
            let leaf = self
                .store
                .get(cursor.page_id())
                .as_leaf()
                .ok_or_else(|| err!(InvariantViolation, "leaf_insert: page is not a leaf"))?;
            leaf.cells.len() >= self.config.leaf_max
        };
        if full {
            warn!(page = cursor.page_id(), "leaf full, splitting");
            return self.split_leaf_and_insert(cursor, key, value);
        }
        let leaf = self
            .store
            .get(cursor.page_id())
            .as_leaf_mut()
            .ok_or_else(|| err!(InvariantViolation, "leaf_insert: page is not a leaf"))?;
        leaf.cells.insert(cursor.cell_index(), (key, value));
        Ok(())
    }

    fn split_leaf_and_insert(
        &mut self,
        cursor: &Cursor,
        key: Key,
        value: S::Value,
    ) -> Result<(), Error> {
        let old_id = cursor.page_id();
        let old_max_before = max_key(&mut self.store, old_id)?;
        let new_id = self.store.alloc();

        let (is_root, parent, next_leaf, mut cells) = {
            let leaf = self
                .store
                .get(old_id)
                .as_leaf_mut()
                .ok_or_else(|| err!(InvariantViolation, "split_leaf: page is not a leaf"))?;
            let cells = std::mem::take(&mut leaf.cells);
            (leaf.is_root, leaf.parent, leaf.next_leaf, cells)
        };

        cells.insert(cursor.cell_index(), (key, value));
        trace!(old_id, new_id, total = cells.len(), "redistributing leaf cells");
        let left_count = self.config.leaf_left();
        let right_cells = cells.split_off(left_count);

        {
            let old_leaf = self
                .store
                .get(old_id)
                .as_leaf_mut()
                .ok_or_else(|| err!(InvariantViolation, "split_leaf: page {} is not a leaf", old_id))?;
            old_leaf.cells = cells;
            old_leaf.next_leaf = Some(new_id);
        }
        self.store.put(
            new_id,
            Node::Leaf(LeafNode {
                is_root: false,
                parent,
                next_leaf,
                cells: right_cells,
            }),
        );

        if is_root {
            self.create_new_root(new_id)?;
        } else {
            let parent_id = parent
                .ok_or_else(|| err!(InvariantViolation, "non-root leaf {} has no parent", old_id))?;
            let new_old_max = max_key(&mut self.store, old_id)?;
            {
                let parent_node = self
                    .store
                    .get(parent_id)
                    .as_internal_mut()
                    .ok_or_else(|| err!(InvariantViolation, "leaf's parent {} is not internal", parent_id))?;
                parent_node.update_key(old_max_before, new_old_max)?;
            }
            let new_child_max = max_key(&mut self.store, new_id)?;
            self.internal_insert(parent_id, new_id, new_child_max)?;
        }
        debug!(old_id, new_id, "leaf split complete");
        Ok(())
    }

    /// Wraps the current root (page 0) in a fresh internal root with two
    /// children: the old root's contents, moved to a new page, and
    /// `right_id`.
    fn create_new_root(&mut self, right_id: PageId) -> Result<(), Error> {
        let root_is_internal = matches!(self.store.get(0), Node::Internal(_));
        if root_is_internal {
            // `right_id` is about to become the right half of a split
            // internal root; materialize it before anything tries to
            // read it (the store would otherwise lazily default it to
            // an empty leaf on first access).
            self.store
                .put(right_id, Node::Internal(InternalNode::empty(false, None)));
        }

        let left_id = self.store.alloc();
        let placeholder = Node::Leaf(LeafNode::empty(false, None));
        let mut left_node = std::mem::replace(self.store.get(0), placeholder);
        left_node.set_root(false);
        self.store.put(left_id, left_node);

        if let Some(left_internal) = self.store.get(left_id).as_internal() {
            let child_ids: Vec<PageId> = left_internal
                .cells
                .iter()
                .map(|(child, _)| *child)
                .chain(left_internal.right_child)
                .collect();
            for child_id in child_ids {
                self.store.get(child_id).set_parent(Some(left_id));
            }
        }

        let left_max = max_key(&mut self.store, left_id)?;
        let mut new_root = InternalNode::empty(true, None);
        new_root.cells.push((left_id, left_max));
        new_root.right_child = Some(right_id);
        self.store.put(0, Node::Internal(new_root));

        self.store.get(left_id).set_parent(Some(0));
        self.store.get(right_id).set_parent(Some(0));
        debug!(left_id, right_id, "promoted new root");
        Ok(())
    }

    /// Inserts `child_id` (whose max key is `child_max`) into the internal
    /// node at `parent_id`, splitting it first if it is already full.
    fn internal_insert(&mut self, parent_id: PageId, child_id: PageId, child_max: Key) -> Result<(), Error> {
        let (idx, len, right_child) = {
            let parent = self
                .store
                .get(parent_id)
                .as_internal()
                .ok_or_else(|| err!(InvariantViolation, "internal_insert: page is not internal"))?;
            (parent.find_child(child_max), parent.cells.len(), parent.right_child)
        };

        if len >= self.config.internal_max {
            return self.split_internal_and_insert(parent_id, child_id, child_max);
        }

        match right_child {
            None => {
                self.store
                    .get(parent_id)
                    .as_internal_mut()
                    .ok_or_else(|| err!(InvariantViolation, "internal_insert: page {} is not internal", parent_id))?
                    .right_child = Some(child_id);
            }
            Some(right) => {
                let right_max = max_key(&mut self.store, right)?;
                let parent = self
                    .store
                    .get(parent_id)
                    .as_internal_mut()
                    .ok_or_else(|| err!(InvariantViolation, "internal_insert: page {} is not internal", parent_id))?;
                if child_max > right_max {
                    parent.cells.push((right, right_max));
                    parent.right_child = Some(child_id);
                } else {
                    parent.cells.insert(idx, (child_id, child_max));
                }
            }
        }
        self.store.get(child_id).set_parent(Some(parent_id));
        Ok(())
    }

    /// Splits the full internal node at `node_id`, then inserts `child_id`
    /// into whichever half it belongs in.
    fn split_internal_and_insert(
        &mut self,
        node_id: PageId,
        child_id: PageId,
        child_max: Key,
    ) -> Result<(), Error> {
        warn!(node_id, "internal node full, splitting");
        let mut old_id = node_id;
        let old_max_key = max_key(&mut self.store, old_id)?;
        let new_id = self.store.alloc();
        let splitting_root = self.store.get(old_id).is_root();

        let parent_id = if splitting_root {
            self.create_new_root(new_id)?;
            let new_root = self
                .store
                .get(0)
                .as_internal()
                .ok_or_else(|| err!(InvariantViolation, "root page 0 is not internal after promotion"))?;
            let new_root_left = new_root
                .cells
                .first()
                .ok_or_else(|| err!(InvariantViolation, "new root has no cells after promotion"))?
                .0;
            old_id = new_root_left;
            0
        } else {
            self.store
                .put(new_id, Node::Internal(InternalNode::empty(false, None)));
            self.store.get(old_id).parent().ok_or_else(|| {
                err!(InvariantViolation, "non-root internal node {} has no parent", old_id)
            })?
        };

        let right_child = {
            let old = self
                .store
                .get(old_id)
                .as_internal_mut()
                .ok_or_else(|| err!(InvariantViolation, "split_internal: page is not internal"))?;
            old.right_child.take()
        };
        if let Some(right_child_id) = right_child {
            let max = max_key(&mut self.store, right_child_id)?;
            self.internal_insert(new_id, right_child_id, max)?;
        }

        let mid = self.config.internal_max / 2;
        loop {
            let len = self
                .store
                .get(old_id)
                .as_internal()
                .ok_or_else(|| err!(InvariantViolation, "split_internal: page {} is not internal", old_id))?
                .cells
                .len();
            if len <= mid + 1 {
                break;
            }
            let (moved_id, _) = self
                .store
                .get(old_id)
                .as_internal_mut()
                .ok_or_else(|| err!(InvariantViolation, "split_internal: page {} is not internal", old_id))?
                .cells
                .pop()
                .ok_or_else(|| err!(InvariantViolation, "internal split popped from an empty node"))?;
            let max = max_key(&mut self.store, moved_id)?;
            self.internal_insert(new_id, moved_id, max)?;
        }

        let (mid_child, _) = self
            .store
            .get(old_id)
            .as_internal_mut()
            .ok_or_else(|| err!(InvariantViolation, "split_internal: page {} is not internal", old_id))?
            .cells
            .pop()
            .ok_or_else(|| err!(InvariantViolation, "internal split produced an empty node"))?;
        self.store
            .get(old_id)
            .as_internal_mut()
            .ok_or_else(|| err!(InvariantViolation, "split_internal: page {} is not internal", old_id))?
            .right_child = Some(mid_child);
        self.store.get(mid_child).set_parent(Some(old_id));

        let old_max_after = max_key(&mut self.store, old_id)?;
        let destination_id = if child_max < old_max_after { old_id } else { new_id };
        self.internal_insert(destination_id, child_id, child_max)?;

        let new_old_max = max_key(&mut self.store, old_id)?;
        {
            let parent = self
                .store
                .get(parent_id)
                .as_internal_mut()
                .ok_or_else(|| err!(InvariantViolation, "split_internal: parent is not internal"))?;
            parent.update_key(old_max_key, new_old_max)?;
        }

        if !splitting_root {
            let new_max = max_key(&mut self.store, new_id)?;
            self.internal_insert(parent_id, new_id, new_max)?;
        }
        debug!(old_id, new_id, "internal split complete");
        Ok(())
    }
}

/// Lazy ascending iterator over `(key, value)` pairs, produced by
/// `Tree::scan`. Requires `S::Value: Clone` since the tree lends values
/// out by reference only through `Cursor::value`.
pub struct Scan<'a, S: PageStore> {
    store: &'a mut S,
    cursor: Cursor,
}

impl<'a, S: PageStore> Iterator for Scan<'a, S>
where
    S::Value: Clone,
{
    type Item = Result<(Key, S::Value), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.end_of_table {
            return None;
        }
        let cell = match self.store.get(self.cursor.page_id()) {
            Node::Leaf(leaf) => leaf.cells.get(self.cursor.cell_index()).cloned(),
            Node::Internal(_) => {
                return Some(Err(err!(
                    InvariantViolation,
                    "scan cursor page {} is not a leaf",
                    self.cursor.page_id()
                )))
            }
        };
        let cell = match cell {
            Some(cell) => cell,
            None => {
                return Some(Err(err!(
                    InvariantViolation,
                    "scan cursor index {} out of bounds",
                    self.cursor.cell_index()
                )))
            }
        };
        if let Err(e) = self.cursor.advance(self.store) {
            return Some(Err(e));
        }
        Some(Ok(cell))
    }
}
