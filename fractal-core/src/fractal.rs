//! The whole component behind one facade: build, per-frame step,
//! teardown. This is the explicit version of the host engine's
//! enable / per-frame-update / disable callback lifecycle.

use crate::config::{ConfigError, FractalConfig};
use crate::emit::{InstanceEmitter, InstanceRenderer, RenderError};
use crate::tree::{Anchor, FractalTree};
use rand::Rng;

/// Failure while building the component.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// A fractal tree plus its emitter, stepped once per frame.
#[derive(Debug)]
pub struct Fractal {
    tree: FractalTree,
    emitter: InstanceEmitter,
}

impl Fractal {
    /// Validates the configuration, allocates every tree level and
    /// acquires the per-level renderer buffers.
    pub fn build(
        cfg: &FractalConfig,
        rng: &mut impl Rng,
        renderer: &mut dyn InstanceRenderer,
    ) -> Result<Self, BuildError> {
        let tree = FractalTree::build(cfg, rng)?;
        let emitter = InstanceEmitter::build(cfg, &tree, rng, renderer)?;
        Ok(Self { tree, emitter })
    }

    pub fn tree(&self) -> &FractalTree {
        &self.tree
    }

    /// Advances the tree by `dt` seconds and submits one draw per
    /// level. Failed levels are logged and skipped for this frame;
    /// returns the number of levels that drew.
    pub fn step(
        &mut self,
        anchor: &Anchor,
        dt: f32,
        renderer: &mut dyn InstanceRenderer,
    ) -> usize {
        self.tree.step(anchor, dt);
        let failures = self.emitter.emit(&self.tree, anchor, renderer);
        self.tree.depth() - failures.len()
    }

    /// Releases the renderer buffers. Called between frames; all
    /// per-level parallel work has already joined inside `step`.
    pub fn teardown(mut self, renderer: &mut dyn InstanceRenderer) {
        self.emitter.teardown(renderer);
    }

    /// Full teardown plus rebuild, for configuration changes. There is
    /// no incremental resize: level counts are fixed per build.
    pub fn rebuild(
        self,
        cfg: &FractalConfig,
        rng: &mut impl Rng,
        renderer: &mut dyn InstanceRenderer,
    ) -> Result<Self, BuildError> {
        self.teardown(renderer);
        Self::build(cfg, rng, renderer)
    }
}
