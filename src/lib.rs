//! An embedded B+tree index: ordered `Key -> Value` storage with lookup,
//! insertion, and full-table ascending scans, kept in memory behind a
//! pluggable `PageStore`.
//!
//! ```
//! use bptree_kv::Tree;
//!
//! let mut tree = Tree::new();
//! tree.insert(3, "three").unwrap();
//! tree.insert(1, "one").unwrap();
//! tree.insert(2, "two").unwrap();
//!
//! let values: Vec<_> = tree
//!     .scan()
//!     .unwrap()
//!     .map(|r| r.unwrap().1)
//!     .collect();
//! assert_eq!(values, vec!["one", "two", "three"]);
//! ```

mod config;
mod errors;
mod storage;

pub use config::{BTreeConfig, DEFAULT_INTERNAL_MAX, DEFAULT_LEAF_MAX};
pub use errors::Error;
pub use storage::{Cursor, InMemoryPageStore, Key, Node, NodeType, PageId, PageStore, Scan, Tree};
