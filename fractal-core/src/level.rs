//! Per-level pose update.
//!
//! One frame advances the tree level by level: [`update_level`] fans a
//! pure per-part function out across one level with rayon and joins
//! before the caller moves to the next level. Parts within a level
//! write only their own slot, so no locking is needed.

use crate::part::PartPose;
use glam::{Affine3A, Quat, Vec3};
use rayon::prelude::*;

/// Advances one part by `dt` seconds given its already-updated parent,
/// and returns the part's instancing matrix (rotation scaled by
/// `scale` in the 3×3, world position in the translation column).
///
/// The sag rotation tilts the part toward vertical in proportion to
/// the *sine* of the angle between its up axis and world up (the
/// cross-product magnitude). This small-angle approximation is a
/// visually tuned part of the design; keep it.
///
/// Reads only `parent` and `part`'s own prior state, writes only
/// `part`; safe to run concurrently across disjoint parts.
pub fn update_part(parent: &PartPose, part: &mut PartPose, scale: f32, dt: f32) -> Affine3A {
    part.spin_angle += part.spin_velocity * dt;

    let up_axis = (parent.world_orientation * part.orientation) * Vec3::Y;
    let sag_axis = Vec3::Y.cross(up_axis);
    let sag_magnitude = sag_axis.length();
    let base_rotation = if sag_magnitude > 0.0 {
        let sag_rotation =
            Quat::from_axis_angle(sag_axis / sag_magnitude, part.max_sag_angle * sag_magnitude);
        sag_rotation * parent.world_orientation
    } else {
        // Up axis exactly parallel to world up: normalizing the zero
        // sag axis would produce NaN, so skip the sag rotation.
        parent.world_orientation
    };

    part.world_orientation =
        base_rotation * (part.orientation * Quat::from_rotation_y(part.spin_angle));
    part.world_position =
        parent.world_position + part.world_orientation * Vec3::new(0.0, 1.5 * scale, 0.0);

    Affine3A::from_scale_rotation_translation(
        Vec3::splat(scale),
        part.world_orientation,
        part.world_position,
    )
}

/// Updates one whole level in parallel.
///
/// Part `i` reads `parents[i / branch_factor]` (finalized by the
/// previous level's update) and writes `parts[i]` and `matrices[i]`
/// only. The rayon iterator joins before returning, so the next level
/// always sees fully updated parents.
pub fn update_level(
    parents: &[PartPose],
    parts: &mut [PartPose],
    matrices: &mut [Affine3A],
    branch_factor: usize,
    scale: f32,
    dt: f32,
) {
    debug_assert_eq!(parts.len(), parents.len() * branch_factor);
    debug_assert_eq!(parts.len(), matrices.len());

    parts
        .par_iter_mut()
        .zip(matrices.par_iter_mut())
        .enumerate()
        .for_each(|(i, (part, matrix))| {
            let parent = &parents[i / branch_factor];
            *matrix = update_part(parent, part, scale, dt);
        });
}
