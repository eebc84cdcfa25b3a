pub mod cursor;
pub mod debug;
pub mod page_store;
pub mod tree;

pub use cursor::Cursor;
pub use page_store::{InMemoryPageStore, Key, Node, NodeType, PageId, PageStore};
pub use tree::{Scan, Tree};
