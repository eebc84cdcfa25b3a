//! Split-threshold knobs for the tree, standing in for the host crate's
//! page-size-derived `leaf_node_max_cells`/`INTERNAL_NODE_MAX_CELLS`
//! constants. Since this engine is not byte-packed, the bounds are plain
//! configurable fields rather than values computed from a fixed page size.

/// Default max cells per leaf before it splits (see `SPEC_FULL.md` §4.1).
pub const DEFAULT_LEAF_MAX: usize = 13;

/// Default max keys per internal node before it splits.
pub const DEFAULT_INTERNAL_MAX: usize = 500;

/// Fanout bounds for a tree. Cloned freely; both fields are plain `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeConfig {
    pub leaf_max: usize,
    pub internal_max: usize,
}

impl BTreeConfig {
    pub fn new(leaf_max: usize, internal_max: usize) -> Self {
        assert!(leaf_max >= 2, "leaf_max must allow at least a 1/1 split");
        assert!(
            internal_max >= 2,
            "internal_max must allow at least a 1/1 split"
        );
        Self {
            leaf_max,
            internal_max,
        }
    }

    /// Cells kept in the old leaf after a split: `(leaf_max + 1) - leaf_right`.
    pub fn leaf_left(&self) -> usize {
        (self.leaf_max + 1) - self.leaf_right()
    }

    /// Cells moved to the new leaf after a split: `(leaf_max + 1) / 2`.
    pub fn leaf_right(&self) -> usize {
        (self.leaf_max + 1) / 2
    }
}

impl Default for BTreeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LEAF_MAX, DEFAULT_INTERNAL_MAX)
    }
}
