use crate::config::{ConfigError, FractalConfig};
use crate::level;
use crate::part::PartPose;
use crate::types::LevelIndex;
use glam::{Affine3A, Quat, Vec3};
use rand::Rng;

/// The host-provided transform the root part follows, read once per
/// frame and never written by the tree.
#[derive(Clone, Copy, Debug)]
pub struct Anchor {
    pub position: Vec3,
    pub orientation: Quat,
    /// Uniform scale; level `i` parts are drawn at `scale * 0.5^i`.
    pub scale: f32,
}

impl Default for Anchor {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: 1.0,
        }
    }
}

/// A fractal tree stored as one flat array per depth level.
///
/// Level 0 holds the single root; level `i` holds
/// `branch_factor^i` parts. The parent of part `i` at level `d` is
/// part `i / branch_factor` at level `d - 1` — implicit arithmetic
/// instead of parent references, so each level is contiguous and can
/// be updated with a parallel fan-out.
///
/// All levels are allocated together by [`FractalTree::build`] and
/// their sizes never change afterwards; reconfiguring means dropping
/// the tree and building a new one.
#[derive(Debug)]
pub struct FractalTree {
    branch_factor: usize,
    levels: Vec<Vec<PartPose>>,
    matrices: Vec<Vec<Affine3A>>,
}

impl FractalTree {
    /// Validates `cfg` and allocates every level.
    ///
    /// Non-root parts get their canonical orientation from their child
    /// slot (`index % branch_factor`) and draw their sag and spin
    /// fields from `rng`; pass a seeded Rng for a reproducible tree.
    pub fn build(cfg: &FractalConfig, rng: &mut impl Rng) -> Result<Self, ConfigError> {
        cfg.validate()?;

        let mut levels = Vec::with_capacity(cfg.depth);
        let mut matrices = Vec::with_capacity(cfg.depth);
        let mut len = 1;
        for li in 0..cfg.depth {
            let parts = (0..len)
                .map(|i| PartPose::spawn(i % cfg.branch_factor, cfg, rng))
                .collect();
            levels.push(parts);
            matrices.push(vec![Affine3A::IDENTITY; len]);
            if li + 1 < cfg.depth {
                len *= cfg.branch_factor;
            }
        }

        Ok(Self {
            branch_factor: cfg.branch_factor,
            levels,
            matrices,
        })
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn branch_factor(&self) -> usize {
        self.branch_factor
    }

    pub fn level(&self, li: LevelIndex) -> &[PartPose] {
        &self.levels[li]
    }

    pub fn matrices(&self, li: LevelIndex) -> &[Affine3A] {
        &self.matrices[li]
    }

    pub fn level_len(&self, li: LevelIndex) -> usize {
        self.levels[li].len()
    }

    pub fn total_parts(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// Root world position as of the last frame step.
    pub fn root_position(&self) -> Vec3 {
        self.levels[0][0].world_position
    }

    /// Advances the root part from the host anchor: spin accumulates,
    /// world orientation is `anchor ∘ slot ∘ rotY(spin)`, world
    /// position is the anchor position. Writes the root's instancing
    /// matrix in place; no allocation.
    pub fn advance_root(&mut self, anchor: &Anchor, dt: f32) {
        let root = &mut self.levels[0][0];
        root.spin_angle += root.spin_velocity * dt;
        root.world_orientation =
            anchor.orientation * (root.orientation * Quat::from_rotation_y(root.spin_angle));
        root.world_position = anchor.position;
        self.matrices[0][0] = Affine3A::from_scale_rotation_translation(
            Vec3::splat(anchor.scale),
            root.world_orientation,
            root.world_position,
        );
    }

    /// Advances the whole tree by one frame.
    ///
    /// The root follows the anchor, then levels update in strict
    /// ascending order, each one a parallel fan-out over its parts
    /// joined before the next level starts. Scale halves per level.
    pub fn step(&mut self, anchor: &Anchor, dt: f32) {
        self.advance_root(anchor, dt);
        let mut scale = anchor.scale;
        for li in 1..self.levels.len() {
            scale *= 0.5;
            let (done, rest) = self.levels.split_at_mut(li);
            level::update_level(
                &done[li - 1],
                &mut rest[0],
                &mut self.matrices[li],
                self.branch_factor,
                scale,
                dt,
            );
        }
    }
}
