/// Index of a level within a [`crate::tree::FractalTree`].
///
/// Level 0 is the root; level `depth - 1` is the leaf level. Only
/// meaningful within the lifetime of a given tree instance.
pub type LevelIndex = usize;

/// Index of a part within one level of a [`crate::tree::FractalTree`].
///
/// The parent of part `i` at level `d` sits at index
/// `i / branch_factor` in level `d - 1`.
pub type PartIndex = usize;
