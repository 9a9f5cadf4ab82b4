//! Core fractal-tree animation library.
//!
//! Main components:
//! - [`part`] — per-node pose state and the canonical child-slot orientations.
//! - [`tree`] — flat per-level storage and the per-frame step.
//! - [`level`] — pure per-part update, fanned out in parallel per level.
//! - [`emit`] — instanced-draw submissions to an external renderer.
//! - [`fractal`] — build / step / teardown facade over tree and emitter.
//! - [`config`] — build-time configuration and validation.
//! - [`color`] — colors and gradients for per-level tinting.
//! - [`types`] — shared index aliases.

pub mod color;
pub mod config;
pub mod emit;
pub mod fractal;
pub mod level;
pub mod part;
pub mod tree;
pub mod types;
