//! Node representation and the pluggable page store that backs the tree.
//!
//! Grounded on the host crate's `storage::btree::{Node, NodeType}` and
//! `storage::table::Pager`, but reworked from a byte-packed, fixed
//! `PAGE_SIZE` buffer into a typed `enum` over `Vec`-backed cells: the
//! tree owns no on-disk format, so there is nothing to pack.

use std::collections::HashMap;

use crate::errors::{err, Error};

/// Opaque page handle. `0` is the permanent root page.
pub type PageId = u32;

/// Tree keys are unsigned and totally ordered.
pub type Key = u64;

/// Discriminant mirroring the host crate's `NodeType`, kept around for
/// callers that want to branch on node kind without matching `Node` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Leaf,
    Internal,
}

/// A leaf node: `(key, value)` cells sorted strictly ascending by key,
/// plus the sibling link used by full-table scans.
#[derive(Debug, Clone)]
pub struct LeafNode<V> {
    pub is_root: bool,
    pub parent: Option<PageId>,
    pub next_leaf: Option<PageId>,
    pub cells: Vec<(Key, V)>,
}

impl<V> LeafNode<V> {
    pub fn empty(is_root: bool, parent: Option<PageId>) -> Self {
        Self {
            is_root,
            parent,
            next_leaf: None,
            cells: Vec::new(),
        }
    }

    /// Binary search for `key`: returns the exact index if present,
    /// otherwise the index of the first cell greater than `key`
    /// (or `cells.len()` if `key` is larger than everything present).
    pub fn find(&self, key: Key) -> usize {
        let mut lo = 0usize;
        let mut hi = self.cells.len();
        while lo != hi {
            let mid = lo + (hi - lo) / 2;
            let key_at_mid = self.cells[mid].0;
            if key_at_mid == key {
                return mid;
            }
            if key < key_at_mid {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    /// The maximum key present, if any.
    pub fn max_key(&self) -> Option<Key> {
        self.cells.last().map(|(k, _)| *k)
    }
}

/// An internal node: `(child_ptr, separator)` cells plus the rightmost
/// child, which has no separator of its own (it owns everything greater
/// than the last cell's separator).
#[derive(Debug, Clone)]
pub struct InternalNode {
    pub is_root: bool,
    pub parent: Option<PageId>,
    pub right_child: Option<PageId>,
    pub cells: Vec<(PageId, Key)>,
}

impl InternalNode {
    pub fn empty(is_root: bool, parent: Option<PageId>) -> Self {
        Self {
            is_root,
            parent,
            right_child: None,
            cells: Vec::new(),
        }
    }

    /// Smallest index `i` with `cells[i].1 >= key`, or `cells.len()` if none.
    pub fn find_child(&self, key: Key) -> usize {
        let mut lo = 0usize;
        let mut hi = self.cells.len();
        while lo != hi {
            let mid = lo + (hi - lo) / 2;
            if self.cells[mid].1 >= key {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    /// The page to descend into for `key`: the cell's child if found,
    /// otherwise `right_child`.
    pub fn child_for(&self, key: Key) -> Result<PageId, Error> {
        let idx = self.find_child(key);
        if idx < self.cells.len() {
            Ok(self.cells[idx].0)
        } else {
            self.right_child
                .ok_or_else(|| err!(InvariantViolation, "internal node has no right child"))
        }
    }

    /// Replaces the separator `old_key` with `new_key`, keeping the child
    /// pointer unchanged.
    pub fn update_key(&mut self, old_key: Key, new_key: Key) -> Result<(), Error> {
        let idx = self.find_child(old_key);
        let cell = self.cells.get_mut(idx).ok_or_else(|| {
            err!(
                InvariantViolation,
                "update_key: separator {} not found",
                old_key
            )
        })?;
        cell.1 = new_key;
        Ok(())
    }
}

/// Tagged variant over the two node layouts. Shared header fields
/// (`is_root`, `parent`) live on each variant rather than a common struct,
/// matching the host crate's `is_root`/`parent_ptr` accessor pattern but
/// expressed as plain fields instead of byte offsets.
#[derive(Debug, Clone)]
pub enum Node<V> {
    Leaf(LeafNode<V>),
    Internal(InternalNode),
}

impl<V> Node<V> {
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Leaf(_) => NodeType::Leaf,
            Node::Internal(_) => NodeType::Internal,
        }
    }

    pub fn is_root(&self) -> bool {
        match self {
            Node::Leaf(l) => l.is_root,
            Node::Internal(i) => i.is_root,
        }
    }

    pub fn set_root(&mut self, is_root: bool) {
        match self {
            Node::Leaf(l) => l.is_root = is_root,
            Node::Internal(i) => i.is_root = is_root,
        }
    }

    pub fn parent(&self) -> Option<PageId> {
        match self {
            Node::Leaf(l) => l.parent,
            Node::Internal(i) => i.parent,
        }
    }

    pub fn set_parent(&mut self, parent: Option<PageId>) {
        match self {
            Node::Leaf(l) => l.parent = parent,
            Node::Internal(i) => i.parent = parent,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafNode<V>> {
        match self {
            Node::Leaf(l) => Some(l),
            Node::Internal(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafNode<V>> {
        match self {
            Node::Leaf(l) => Some(l),
            Node::Internal(_) => None,
        }
    }

    pub fn as_internal(&self) -> Option<&InternalNode> {
        match self {
            Node::Internal(i) => Some(i),
            Node::Leaf(_) => None,
        }
    }

    pub fn as_internal_mut(&mut self) -> Option<&mut InternalNode> {
        match self {
            Node::Internal(i) => Some(i),
            Node::Leaf(_) => None,
        }
    }
}

/// The tree's only external collaborator: an opaque `page_id -> Node`
/// mapping with a monotone allocator. `get` is load-bearing in that it
/// lazily materializes a default empty leaf for pages that have been
/// `alloc`'d but never `put` — split routines depend on this (see
/// `SPEC_FULL.md` §4.2).
pub trait PageStore {
    /// The opaque payload type stored alongside each key.
    type Value;

    /// Returns a fresh page id, strictly monotone from 1 upward (page 0
    /// is reserved for the root).
    fn alloc(&mut self) -> PageId;

    /// Returns the node at `id`, lazily creating a default empty leaf if
    /// `id` has never been written.
    fn get(&mut self, id: PageId) -> &mut Node<Self::Value>;

    /// Overwrites whatever exists at `id`.
    fn put(&mut self, id: PageId, node: Node<Self::Value>);
}

/// Default in-process page store: a `HashMap` keyed by page id. Sufficient
/// for an embedded/in-process key-value store; a disk-backed `PageStore`
/// could be swapped in without touching `Tree`.
#[derive(Debug, Default)]
pub struct InMemoryPageStore<V> {
    pages: HashMap<PageId, Node<V>>,
    next_id: PageId,
}

impl<V> InMemoryPageStore<V> {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<V> PageStore for InMemoryPageStore<V> {
    type Value = V;

    fn alloc(&mut self) -> PageId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn get(&mut self, id: PageId) -> &mut Node<V> {
        self.pages
            .entry(id)
            .or_insert_with(|| Node::Leaf(LeafNode::empty(false, None)))
    }

    fn put(&mut self, id: PageId, node: Node<V>) {
        self.pages.insert(id, node);
    }
}

/// The maximum key reachable from `id`: for a leaf, its last cell's key;
/// for an internal node, the recursive `max_key` of its `right_child`.
/// A free function rather than a `PageStore` trait method because it
/// needs to recurse through *other* pages the store owns.
pub fn max_key<S: PageStore>(store: &mut S, id: PageId) -> Result<Key, Error> {
    let right_child = match store.get(id) {
        Node::Leaf(leaf) => {
            return leaf
                .max_key()
                .ok_or_else(|| err!(InvariantViolation, "max_key of empty leaf at page {}", id));
        }
        Node::Internal(internal) => internal.right_child,
    };
    let right_child = right_child.ok_or_else(|| {
        err!(
            InvariantViolation,
            "internal node at page {} has no right child",
            id
        )
    })?;
    max_key(store, right_child)
}
