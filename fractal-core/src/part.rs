use crate::config::FractalConfig;
use glam::{Quat, Vec3};
use rand::Rng;
use std::f32::consts::FRAC_1_SQRT_2;

/// The five canonical child-slot orientations, indexed by
/// `child_index % branch_factor`:
///
/// 0. identity (trunk continuation)
/// 1. -90° about Z
/// 2. +90° about Z
/// 3. +90° about X
/// 4. -90° about X
pub const CHILD_ORIENTATIONS: [Quat; 5] = [
    Quat::IDENTITY,
    Quat::from_xyzw(0.0, 0.0, -FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    Quat::from_xyzw(0.0, 0.0, FRAC_1_SQRT_2, FRAC_1_SQRT_2),
    Quat::from_xyzw(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2),
    Quat::from_xyzw(-FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2),
];

/// Per-node transform state of one fractal part.
///
/// `orientation`, `max_sag_angle` and `spin_velocity` are fixed at
/// creation; the world pose and `spin_angle` are rewritten every frame.
#[derive(Clone, Copy, Debug)]
pub struct PartPose {
    /// Accumulated spin around the part's local up axis, radians.
    pub spin_angle: f32,
    /// Canonical child-slot orientation, never mutated after creation.
    pub orientation: Quat,
    pub world_position: Vec3,
    pub world_orientation: Quat,
    /// Maximum gravity droop, radians.
    pub max_sag_angle: f32,
    /// Spin rate, radians per second; negative for reversed spin.
    pub spin_velocity: f32,
}

impl PartPose {
    /// Creates a part for the given child slot, drawing the randomized
    /// fields (`max_sag_angle`, `spin_velocity`) from `rng` using the
    /// ranges in `cfg`. The world pose starts at identity and is only
    /// meaningful after the first frame step.
    pub fn spawn(child_slot: usize, cfg: &FractalConfig, rng: &mut impl Rng) -> Self {
        let (sag_min, sag_max) = cfg.sag_angle;
        let (spin_min, spin_max) = cfg.spin_speed;
        let direction = if rng.random::<f32>() < cfg.reverse_spin_chance {
            -1.0
        } else {
            1.0
        };
        Self {
            spin_angle: 0.0,
            orientation: CHILD_ORIENTATIONS[child_slot],
            world_position: Vec3::ZERO,
            world_orientation: Quat::IDENTITY,
            max_sag_angle: rng.random_range(sag_min..=sag_max).to_radians(),
            spin_velocity: direction * rng.random_range(spin_min..=spin_max).to_radians(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn canonical_orientations_match_axis_angle_rotations() {
        let expected = [
            Quat::IDENTITY,
            Quat::from_rotation_z(-FRAC_PI_2),
            Quat::from_rotation_z(FRAC_PI_2),
            Quat::from_rotation_x(FRAC_PI_2),
            Quat::from_rotation_x(-FRAC_PI_2),
        ];
        for (got, want) in CHILD_ORIENTATIONS.iter().zip(expected.iter()) {
            assert!(got.abs_diff_eq(*want, 1e-6), "{got:?} vs {want:?}");
        }
    }

    #[test]
    fn spawn_draws_fields_within_configured_ranges() {
        let cfg = FractalConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        for slot in 0..5 {
            let part = PartPose::spawn(slot, &cfg, &mut rng);
            assert_eq!(part.orientation, CHILD_ORIENTATIONS[slot]);
            assert_eq!(part.spin_angle, 0.0);
            assert!(part.max_sag_angle >= cfg.sag_angle.0.to_radians());
            assert!(part.max_sag_angle <= cfg.sag_angle.1.to_radians());
            let speed = part.spin_velocity.abs();
            assert!(speed >= cfg.spin_speed.0.to_radians());
            assert!(speed <= cfg.spin_speed.1.to_radians());
        }
    }

    #[test]
    fn spawn_never_reverses_spin_with_zero_chance() {
        let mut cfg = FractalConfig::default();
        cfg.reverse_spin_chance = 0.0;
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..64 {
            let part = PartPose::spawn(0, &cfg, &mut rng);
            assert!(part.spin_velocity > 0.0);
        }
    }

    #[test]
    fn spawn_always_reverses_spin_with_full_chance() {
        let mut cfg = FractalConfig::default();
        cfg.reverse_spin_chance = 1.0;
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..64 {
            let part = PartPose::spawn(0, &cfg, &mut rng);
            assert!(part.spin_velocity < 0.0);
        }
    }
}
