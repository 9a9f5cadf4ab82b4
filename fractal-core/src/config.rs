use crate::color::{Color, Gradient};
use crate::emit::{MaterialHandle, MeshHandle};
use crate::part::CHILD_ORIENTATIONS;

/// Build-time configuration for a fractal tree.
///
/// All fields are read once when the tree is built; changing any of
/// them requires a full teardown and rebuild. Angle ranges are in
/// degrees (converted to radians when parts are spawned), matching
/// the usual inspector-style tuning ranges.
#[derive(Clone, Debug)]
pub struct FractalConfig {
    /// Number of levels, at least 1. Practical values are 3–8.
    pub depth: usize,
    /// Children per parent; this design fixes it at 5.
    pub branch_factor: usize,
    /// Min/max gravity droop per part, degrees.
    pub sag_angle: (f32, f32),
    /// Min/max spin rate per part, degrees per second.
    pub spin_speed: (f32, f32),
    /// Probability in `[0, 1]` that a part spins backwards.
    pub reverse_spin_chance: f32,

    /// First color gradient over the non-leaf levels.
    pub gradient_a: Gradient,
    /// Second color gradient over the non-leaf levels.
    pub gradient_b: Gradient,
    pub leaf_color_a: Color,
    pub leaf_color_b: Color,

    /// Mesh drawn for every non-leaf level.
    pub mesh: MeshHandle,
    /// Mesh drawn for the deepest level.
    pub leaf_mesh: MeshHandle,
    pub material: MaterialHandle,
}

impl Default for FractalConfig {
    fn default() -> Self {
        Self {
            depth: 4,
            branch_factor: 5,
            sag_angle: (15.0, 25.0),
            spin_speed: (20.0, 25.0),
            reverse_spin_chance: 0.25,
            gradient_a: Gradient::linear(
                Color::rgb(0.35, 0.2, 0.08),
                Color::rgb(0.9, 0.75, 0.3),
            ),
            gradient_b: Gradient::linear(
                Color::rgb(0.25, 0.14, 0.05),
                Color::rgb(0.75, 0.6, 0.2),
            ),
            leaf_color_a: Color::rgb(0.2, 0.7, 0.15),
            leaf_color_b: Color::rgb(0.5, 0.9, 0.3),
            mesh: MeshHandle(0),
            leaf_mesh: MeshHandle(1),
            material: MaterialHandle(0),
        }
    }
}

/// Rejected build-time configuration. Never clamped or repaired.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("depth must be at least 1, got {0}")]
    DepthTooSmall(usize),

    #[error("branch factor must be between 1 and {max}, got {got}")]
    BranchFactorOutOfRange { got: usize, max: usize },

    #[error("{name} range has min {min} greater than max {max}")]
    InvertedRange {
        name: &'static str,
        min: f32,
        max: f32,
    },

    #[error("reverse spin chance must be within [0, 1], got {0}")]
    ChanceOutOfRange(f32),
}

impl FractalConfig {
    /// Checks every build-time constraint, failing fast on the first
    /// violation instead of clamping.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth < 1 {
            return Err(ConfigError::DepthTooSmall(self.depth));
        }
        if self.branch_factor < 1 || self.branch_factor > CHILD_ORIENTATIONS.len() {
            return Err(ConfigError::BranchFactorOutOfRange {
                got: self.branch_factor,
                max: CHILD_ORIENTATIONS.len(),
            });
        }
        for (name, (min, max)) in [("sag angle", self.sag_angle), ("spin speed", self.spin_speed)]
        {
            if min > max {
                return Err(ConfigError::InvertedRange { name, min, max });
            }
        }
        if !(0.0..=1.0).contains(&self.reverse_spin_chance) {
            return Err(ConfigError::ChanceOutOfRange(self.reverse_spin_chance));
        }
        Ok(())
    }
}
