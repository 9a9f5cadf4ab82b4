//! Instanced-draw submission to an external renderer.
//!
//! The tree never talks to a GPU directly: it hands each level's
//! matrix buffer, a color pair and a per-level seed vector to an
//! [`InstanceRenderer`], one fire-and-forget submission per level per
//! frame. The renderer is assumed to consume the buffer synchronously
//! within the frame; there is no acknowledgment and no backpressure.

use crate::color::{Color, Gradient};
use crate::config::FractalConfig;
use crate::tree::{Anchor, FractalTree};
use crate::types::LevelIndex;
use glam::{Affine3A, Vec3, Vec4};
use rand::Rng;

/// Opaque handle to a mesh owned by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Opaque handle to a material owned by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u32);

/// Opaque handle to a renderer-resident instance buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceBufferId(pub u32);

/// Axis-aligned bounding volume for one submission.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub center: Vec3,
    pub extents: Vec3,
}

/// Reusable per-draw uniform state (color pair plus seed vector),
/// the explicit stand-in for a shared GPU binding scratch object.
/// Owned by the emitter, created on first use, released at teardown.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BindingBlock {
    pub color_a: Color,
    pub color_b: Color,
    pub seed: Vec4,
}

/// One level's draw call: everything the external service needs to
/// upload the matrices and issue an instanced draw.
#[derive(Debug)]
pub struct DrawSubmission<'a> {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
    pub buffer: InstanceBufferId,
    pub matrices: &'a [Affine3A],
    pub bounds: Bounds,
    pub binding: &'a BindingBlock,
}

/// Failure reported by the external renderer. A draw failure is fatal
/// for that level's draw this frame only; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("instance buffer acquisition for {len} instances failed: {reason}")]
    BufferAcquisition { len: usize, reason: String },

    #[error("instanced draw of {instances} instances failed: {reason}")]
    Draw { instances: usize, reason: String },
}

/// The external GPU instanced-draw service.
pub trait InstanceRenderer {
    /// Acquires a renderer-resident buffer sized for `len` instance
    /// matrices.
    fn create_instance_buffer(&mut self, len: usize) -> Result<InstanceBufferId, RenderError>;

    /// Releases a buffer previously returned by
    /// [`InstanceRenderer::create_instance_buffer`].
    fn release_instance_buffer(&mut self, buffer: InstanceBufferId);

    /// Uploads `submission.matrices` into `submission.buffer` and
    /// draws `matrices.len()` instances.
    fn draw_instanced(&mut self, submission: &DrawSubmission<'_>) -> Result<(), RenderError>;
}

/// Turns a tree's per-level matrices into draw submissions.
///
/// Built together with a tree and holding one renderer buffer and one
/// persistent random seed vector per level; both live until
/// [`InstanceEmitter::teardown`]. Rebuilding the tree means rebuilding
/// the emitter too, so buffer sizes always match level sizes.
#[derive(Debug)]
pub struct InstanceEmitter {
    mesh: MeshHandle,
    leaf_mesh: MeshHandle,
    material: MaterialHandle,
    gradient_a: Gradient,
    gradient_b: Gradient,
    leaf_color_a: Color,
    leaf_color_b: Color,
    seeds: Vec<Vec4>,
    buffers: Vec<InstanceBufferId>,
    binding: Option<BindingBlock>,
}

impl InstanceEmitter {
    /// Creates one renderer buffer per tree level and draws each
    /// level's persistent seed vector from `rng`.
    ///
    /// If any buffer acquisition fails, buffers acquired so far are
    /// released and the error is returned.
    pub fn build(
        cfg: &FractalConfig,
        tree: &FractalTree,
        rng: &mut impl Rng,
        renderer: &mut dyn InstanceRenderer,
    ) -> Result<Self, RenderError> {
        let mut buffers = Vec::with_capacity(tree.depth());
        let mut seeds = Vec::with_capacity(tree.depth());
        for li in 0..tree.depth() {
            match renderer.create_instance_buffer(tree.level_len(li)) {
                Ok(id) => buffers.push(id),
                Err(err) => {
                    for id in buffers.drain(..) {
                        renderer.release_instance_buffer(id);
                    }
                    return Err(err);
                }
            }
            seeds.push(Vec4::new(
                rng.random(),
                rng.random(),
                rng.random(),
                rng.random(),
            ));
        }

        Ok(Self {
            mesh: cfg.mesh,
            leaf_mesh: cfg.leaf_mesh,
            material: cfg.material,
            gradient_a: cfg.gradient_a.clone(),
            gradient_b: cfg.gradient_b.clone(),
            leaf_color_a: cfg.leaf_color_a,
            leaf_color_b: cfg.leaf_color_b,
            seeds,
            buffers,
            binding: None,
        })
    }

    /// Color pair for one level.
    ///
    /// The deepest level gets the fixed leaf pair; every other level
    /// samples the two gradients at `level / (depth - 2)`, so the
    /// second-to-last level lands on the gradient end. For trees of
    /// depth 1 or 2 there is at most one non-leaf level and the
    /// interpolant is taken as 0.
    pub fn level_colors(&self, level: LevelIndex, depth: usize) -> (Color, Color) {
        if level + 1 == depth {
            (self.leaf_color_a, self.leaf_color_b)
        } else {
            let t = if depth > 2 {
                level as f32 / (depth as f32 - 2.0)
            } else {
                0.0
            };
            (self.gradient_a.evaluate(t), self.gradient_b.evaluate(t))
        }
    }

    /// Persistent seed vector assigned to a level at build time.
    pub fn level_seed(&self, level: LevelIndex) -> Vec4 {
        self.seeds[level]
    }

    /// Submits one draw per level for the current frame.
    ///
    /// A failed level is logged and collected; the remaining levels
    /// still draw. Returns the per-level failures (empty on a clean
    /// frame).
    pub fn emit(
        &mut self,
        tree: &FractalTree,
        anchor: &Anchor,
        renderer: &mut dyn InstanceRenderer,
    ) -> Vec<(LevelIndex, RenderError)> {
        let depth = tree.depth();
        debug_assert_eq!(self.buffers.len(), depth);

        let bounds = Bounds {
            center: tree.root_position(),
            extents: Vec3::splat(3.0 * anchor.scale),
        };

        let mut failures = Vec::new();
        for li in 0..depth {
            let (color_a, color_b) = self.level_colors(li, depth);
            let mesh = if li + 1 == depth {
                self.leaf_mesh
            } else {
                self.mesh
            };
            let seed = self.seeds[li];

            let binding = self.binding.get_or_insert_with(BindingBlock::default);
            binding.color_a = color_a;
            binding.color_b = color_b;
            binding.seed = seed;

            let submission = DrawSubmission {
                mesh,
                material: self.material,
                buffer: self.buffers[li],
                matrices: tree.matrices(li),
                bounds,
                binding: &*binding,
            };
            if let Err(err) = renderer.draw_instanced(&submission) {
                log::warn!("level {li} draw failed, skipping for this frame: {err}");
                failures.push((li, err));
            }
        }
        failures
    }

    /// Releases every renderer buffer and the binding scratch. The
    /// emitter must not be used afterwards.
    pub fn teardown(&mut self, renderer: &mut dyn InstanceRenderer) {
        for id in self.buffers.drain(..) {
            renderer.release_instance_buffer(id);
        }
        self.seeds.clear();
        self.binding = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[derive(Debug, Clone)]
    struct DrawRecord {
        buffer: InstanceBufferId,
        mesh: MeshHandle,
        instances: usize,
        color_a: Color,
        color_b: Color,
        seed: Vec4,
        bounds: Bounds,
    }

    /// Renderer double that records every call and can be told to
    /// fail draws for chosen buffers.
    #[derive(Debug, Default)]
    struct RecordingRenderer {
        next_id: u32,
        created: Vec<(InstanceBufferId, usize)>,
        released: Vec<InstanceBufferId>,
        draws: Vec<DrawRecord>,
        fail_draw_for: Vec<InstanceBufferId>,
        fail_create_after: Option<usize>,
    }

    impl InstanceRenderer for RecordingRenderer {
        fn create_instance_buffer(&mut self, len: usize) -> Result<InstanceBufferId, RenderError> {
            if let Some(limit) = self.fail_create_after
                && self.created.len() >= limit
            {
                return Err(RenderError::BufferAcquisition {
                    len,
                    reason: "out of memory".into(),
                });
            }
            let id = InstanceBufferId(self.next_id);
            self.next_id += 1;
            self.created.push((id, len));
            Ok(id)
        }

        fn release_instance_buffer(&mut self, buffer: InstanceBufferId) {
            self.released.push(buffer);
        }

        fn draw_instanced(&mut self, submission: &DrawSubmission<'_>) -> Result<(), RenderError> {
            if self.fail_draw_for.contains(&submission.buffer) {
                return Err(RenderError::Draw {
                    instances: submission.matrices.len(),
                    reason: "device lost".into(),
                });
            }
            self.draws.push(DrawRecord {
                buffer: submission.buffer,
                mesh: submission.mesh,
                instances: submission.matrices.len(),
                color_a: submission.binding.color_a,
                color_b: submission.binding.color_b,
                seed: submission.binding.seed,
                bounds: submission.bounds,
            });
            Ok(())
        }
    }

    fn build_pair(depth: usize) -> (FractalConfig, FractalTree, RecordingRenderer) {
        let mut cfg = FractalConfig::default();
        cfg.depth = depth;
        let tree = FractalTree::build(&cfg, &mut StdRng::seed_from_u64(5)).unwrap();
        (cfg, tree, RecordingRenderer::default())
    }

    #[test]
    fn build_creates_one_buffer_per_level_with_matching_sizes() {
        let (cfg, tree, mut renderer) = build_pair(4);
        let emitter =
            InstanceEmitter::build(&cfg, &tree, &mut StdRng::seed_from_u64(9), &mut renderer)
                .unwrap();

        assert_eq!(renderer.created.len(), 4);
        for (li, (_, len)) in renderer.created.iter().enumerate() {
            assert_eq!(*len, tree.level_len(li));
        }
        drop(emitter);
    }

    #[test]
    fn failed_buffer_acquisition_releases_earlier_buffers() {
        let (cfg, tree, mut renderer) = build_pair(4);
        renderer.fail_create_after = Some(2);

        let result =
            InstanceEmitter::build(&cfg, &tree, &mut StdRng::seed_from_u64(9), &mut renderer);
        assert!(matches!(
            result,
            Err(RenderError::BufferAcquisition { .. })
        ));
        assert_eq!(renderer.released.len(), 2);
    }

    #[test]
    fn emit_submits_every_level_in_order() {
        let (cfg, mut tree, mut renderer) = build_pair(3);
        let mut emitter =
            InstanceEmitter::build(&cfg, &tree, &mut StdRng::seed_from_u64(9), &mut renderer)
                .unwrap();

        let anchor = Anchor::default();
        tree.step(&anchor, 0.016);
        let failures = emitter.emit(&tree, &anchor, &mut renderer);

        assert!(failures.is_empty());
        assert_eq!(renderer.draws.len(), 3);
        for (li, draw) in renderer.draws.iter().enumerate() {
            assert_eq!(draw.instances, tree.level_len(li));
            assert_eq!(draw.bounds.center, tree.root_position());
            assert_eq!(draw.bounds.extents, Vec3::splat(3.0));
        }
    }

    #[test]
    fn leaf_level_gets_leaf_colors_and_mesh_others_interpolate() {
        let (cfg, mut tree, mut renderer) = build_pair(5);
        let mut emitter =
            InstanceEmitter::build(&cfg, &tree, &mut StdRng::seed_from_u64(9), &mut renderer)
                .unwrap();

        let anchor = Anchor::default();
        tree.step(&anchor, 0.016);
        emitter.emit(&tree, &anchor, &mut renderer);

        let leaf = &renderer.draws[4];
        assert_eq!(leaf.mesh, cfg.leaf_mesh);
        assert_eq!(leaf.color_a, cfg.leaf_color_a);
        assert_eq!(leaf.color_b, cfg.leaf_color_b);

        for li in 0..4 {
            let draw = &renderer.draws[li];
            let t = li as f32 / 3.0;
            assert_eq!(draw.mesh, cfg.mesh);
            assert_eq!(draw.color_a, cfg.gradient_a.evaluate(t));
            assert_eq!(draw.color_b, cfg.gradient_b.evaluate(t));
        }
    }

    #[test]
    fn depth_one_tree_is_a_single_leaf() {
        let (cfg, mut tree, mut renderer) = build_pair(1);
        let mut emitter =
            InstanceEmitter::build(&cfg, &tree, &mut StdRng::seed_from_u64(9), &mut renderer)
                .unwrap();

        let anchor = Anchor::default();
        tree.step(&anchor, 0.016);
        emitter.emit(&tree, &anchor, &mut renderer);

        assert_eq!(renderer.draws.len(), 1);
        assert_eq!(renderer.draws[0].mesh, cfg.leaf_mesh);
        assert_eq!(renderer.draws[0].color_a, cfg.leaf_color_a);
    }

    #[test]
    fn seeds_persist_across_frames() {
        let (cfg, mut tree, mut renderer) = build_pair(3);
        let mut emitter =
            InstanceEmitter::build(&cfg, &tree, &mut StdRng::seed_from_u64(9), &mut renderer)
                .unwrap();

        let anchor = Anchor::default();
        tree.step(&anchor, 0.016);
        emitter.emit(&tree, &anchor, &mut renderer);
        tree.step(&anchor, 0.016);
        emitter.emit(&tree, &anchor, &mut renderer);

        assert_eq!(renderer.draws.len(), 6);
        for li in 0..3 {
            assert_eq!(renderer.draws[li].seed, renderer.draws[li + 3].seed);
            assert_eq!(renderer.draws[li].seed, emitter.level_seed(li));
        }
    }

    #[test]
    fn a_failed_level_does_not_stop_the_others() {
        let (cfg, mut tree, mut renderer) = build_pair(4);
        let mut emitter =
            InstanceEmitter::build(&cfg, &tree, &mut StdRng::seed_from_u64(9), &mut renderer)
                .unwrap();
        // Fail level 1's buffer.
        renderer.fail_draw_for = vec![renderer.created[1].0];

        let anchor = Anchor::default();
        tree.step(&anchor, 0.016);
        let failures = emitter.emit(&tree, &anchor, &mut renderer);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        assert_eq!(renderer.draws.len(), 3);
    }

    #[test]
    fn teardown_releases_every_buffer() {
        let (cfg, tree, mut renderer) = build_pair(4);
        let mut emitter =
            InstanceEmitter::build(&cfg, &tree, &mut StdRng::seed_from_u64(9), &mut renderer)
                .unwrap();

        emitter.teardown(&mut renderer);
        assert_eq!(renderer.released.len(), 4);
        let created: Vec<_> = renderer.created.iter().map(|(id, _)| *id).collect();
        assert_eq!(renderer.released, created);
    }
}
