//! Keyframe Smoothing
//!
//! Expands a keyframe sequence by inserting eased, slightly jittered frames
//! between each consecutive pair so the robot does not move in straight,
//! constant-velocity segments.

use crate::keyframe::{Keyframe, Pose, round3};
use rand::Rng;

/// Maximum absolute jitter added to each interpolated angle, in radians.
pub const JITTER_RADIANS: f64 = 0.005;

/// Cubic ease-in-out curve `3t² − 2t³`.
///
/// Zero slope at both ends, `f(0) = 0`, `f(0.5) = 0.5`, `f(1) = 1`.
pub fn ease_in_out(t: f64) -> f64 {
    3.0 * t * t - 2.0 * t * t * t
}

/// Inserts `steps - 1` eased frames between every consecutive pair.
///
/// Original frames are re-emitted rounded to 3 decimals, shared boundary frames
/// once. Only inserted frames carry jitter; they are clamped back into the
/// joint limits afterwards. `steps <= 1` re-emits the input rounded.
/// Timestamps are emitted as computed; callers own ordering.
pub fn smooth<R: Rng + ?Sized>(rng: &mut R, keyframes: &[Keyframe], steps: usize) -> Vec<Keyframe> {
    if keyframes.len() < 2 {
        return keyframes.iter().map(Keyframe::rounded).collect();
    }

    let inserted = steps.saturating_sub(1);
    let mut out = Vec::with_capacity(keyframes.len() + (keyframes.len() - 1) * inserted);
    out.push(keyframes[0].rounded());

    for pair in keyframes.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        for step_i in 1..steps.max(1) {
            let t = ease_in_out(step_i as f64 / steps as f64);
            out.push(interpolate(rng, a, b, t));
        }
        out.push(b.rounded());
    }

    out
}

fn interpolate<R: Rng + ?Sized>(rng: &mut R, a: &Keyframe, b: &Keyframe, t: f64) -> Keyframe {
    let mut pose = Pose::empty();
    for (joint, start) in a.pose.iter() {
        let end = b.pose.get(joint).unwrap_or(start);
        let jitter = rng.random_range(-JITTER_RADIANS..=JITTER_RADIANS);
        let angle = joint.limits().clamp(start + (end - start) * t + jitter);
        pose.set(joint, round3(angle));
    }
    Keyframe::new(round3(a.time + (b.time - a.time) * t), pose)
}
