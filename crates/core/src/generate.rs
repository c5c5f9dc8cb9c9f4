//! Procedural beat-gesture keyframes.

use crate::keyframe::{Joint, Keyframe, Pose, round3};
use rand::Rng;

/// Fraction of a joint's full range used as the peak amplitude at scale 1.0.
pub const BEAT_AMPLITUDE_FACTOR: f64 = 0.2;

/// Generates a neutral → random peak → neutral beat gesture.
///
/// The peak frame sits at `total_duration / 2`. For each joint the peak angle
/// is drawn uniformly from `[-r, r]` with
/// `r = (max - min) * BEAT_AMPLITUDE_FACTOR * amplitude_scale`, then clamped to
/// the joint limits and rounded to 3 decimals.
pub fn generate_beat_frames<R: Rng + ?Sized>(
    rng: &mut R,
    total_duration: f64,
    amplitude_scale: f64,
) -> [Keyframe; 3] {
    let mut peak = Pose::empty();
    for joint in Joint::ALL {
        let limits = joint.limits();
        let r = (limits.span() * BEAT_AMPLITUDE_FACTOR * amplitude_scale).abs();
        let angle = rng.random_range(-r..=r);
        peak.set(joint, round3(limits.clamp(angle)));
    }

    [
        Keyframe::new(0.0, Pose::neutral()),
        Keyframe::new(total_duration / 2.0, peak),
        Keyframe::new(total_duration, Pose::neutral()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_peak_stays_within_limits() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            for scale in [0.0, 0.5, 1.0, 1.6, 5.0, 40.0] {
                let frames = generate_beat_frames(&mut rng, 1000.0, scale);
                for (joint, angle) in frames[1].pose.iter() {
                    assert!(
                        joint.limits().contains(angle),
                        "{joint} = {angle} out of range at scale {scale}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_endpoints_are_neutral() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let frames = generate_beat_frames(&mut rng, 2000.0, 1.6);
            assert_eq!(frames[0], Keyframe::new(0.0, Pose::neutral()));
            assert_eq!(frames[2], Keyframe::new(2000.0, Pose::neutral()));
        }
    }

    #[test]
    fn test_timing_and_full_joint_coverage() {
        let mut rng = StdRng::seed_from_u64(7);
        let frames = generate_beat_frames(&mut rng, 1000.0, 0.5);
        assert_eq!(frames[1].time, 500.0);
        assert_eq!(frames[1].pose.iter().count(), Joint::COUNT);
    }

    #[test]
    fn test_amplitude_bound_at_small_scale() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let frames = generate_beat_frames(&mut rng, 1000.0, 0.5);
            for (joint, angle) in frames[1].pose.iter() {
                let r = joint.limits().span() * BEAT_AMPLITUDE_FACTOR * 0.5;
                assert!(angle.abs() <= r + 0.0005);
            }
        }
    }

    #[test]
    fn test_zero_scale_is_neutral_peak() {
        let mut rng = StdRng::seed_from_u64(3);
        let frames = generate_beat_frames(&mut rng, 1000.0, 0.0);
        assert!(frames[1].pose.iter().all(|(_, angle)| angle == 0.0));
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = generate_beat_frames(&mut StdRng::seed_from_u64(42), 1000.0, 1.0);
        let b = generate_beat_frames(&mut StdRng::seed_from_u64(42), 1000.0, 1.0);
        assert_eq!(a, b);
    }
}
