//! Joint and Keyframe Model
//!
//! Fixed schema for the actuated axes used by gestures. Angles are stored in a
//! per-joint array slot so a keyframe can leave joints unset; an unset joint
//! inherits the previous frame's value during interpolation.

use serde::{Serialize, Serializer, ser::SerializeMap};
use std::fmt;

/// Hardware limits of a single axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    /// Lowest reachable angle in radians.
    pub min: f64,
    /// Highest reachable angle in radians.
    pub max: f64,
    /// Nominal minimum time for a full move, in milliseconds. Informational.
    pub min_move_ms: u32,
}

impl JointLimits {
    /// Clamps an angle into `[min, max]`.
    pub fn clamp(&self, angle: f64) -> f64 {
        angle.clamp(self.min, self.max)
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.min && angle <= self.max
    }
}

/// A controllable robot axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Joint {
    HeadYaw,
    HeadRoll,
    HeadPitch,
    LeftUpperArmPitch,
    RightUpperArmPitch,
}

impl Joint {
    pub const COUNT: usize = 5;

    /// Every joint, in slot order.
    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::HeadYaw,
        Joint::HeadRoll,
        Joint::HeadPitch,
        Joint::LeftUpperArmPitch,
        Joint::RightUpperArmPitch,
    ];

    /// Slot of this joint inside a [`Pose`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The actuator name used on the wire and in gesture files.
    pub const fn name(self) -> &'static str {
        match self {
            Joint::HeadYaw => "body.head.yaw",
            Joint::HeadRoll => "body.head.roll",
            Joint::HeadPitch => "body.head.pitch",
            Joint::LeftUpperArmPitch => "body.arms.left.upper.pitch",
            Joint::RightUpperArmPitch => "body.arms.right.upper.pitch",
        }
    }

    pub fn from_name(name: &str) -> Option<Joint> {
        Joint::ALL.into_iter().find(|j| j.name() == name)
    }

    pub const fn limits(self) -> JointLimits {
        match self {
            Joint::HeadYaw => JointLimits { min: -0.874, max: 0.874, min_move_ms: 600 },
            Joint::HeadRoll => JointLimits { min: -0.174, max: 0.174, min_move_ms: 400 },
            Joint::HeadPitch => JointLimits { min: -0.174, max: 0.174, min_move_ms: 400 },
            Joint::LeftUpperArmPitch => JointLimits { min: -2.59, max: 1.59, min_move_ms: 1600 },
            Joint::RightUpperArmPitch => JointLimits { min: -2.59, max: 1.59, min_move_ms: 1600 },
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Target angles for a subset of joints.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose([Option<f64>; Joint::COUNT]);

impl Pose {
    /// A pose with no joints set.
    pub const fn empty() -> Self {
        Self([None; Joint::COUNT])
    }

    /// Every joint at angle zero.
    pub const fn neutral() -> Self {
        Self([Some(0.0); Joint::COUNT])
    }

    pub fn get(&self, joint: Joint) -> Option<f64> {
        self.0[joint.index()]
    }

    pub fn set(&mut self, joint: Joint, angle: f64) {
        self.0[joint.index()] = Some(angle);
    }

    pub fn with(mut self, joint: Joint, angle: f64) -> Self {
        self.set(joint, angle);
        self
    }

    /// Iterates over the joints that carry an angle.
    pub fn iter(&self) -> impl Iterator<Item = (Joint, f64)> + '_ {
        Joint::ALL
            .into_iter()
            .filter_map(|j| self.get(j).map(|angle| (j, angle)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Applies `f` to every set angle.
    pub fn map(&self, mut f: impl FnMut(Joint, f64) -> f64) -> Self {
        let mut out = Pose::empty();
        for (joint, angle) in self.iter() {
            out.set(joint, f(joint, angle));
        }
        out
    }
}

impl Serialize for Pose {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (joint, angle) in self.iter() {
            map.serialize_entry(joint.name(), &angle)?;
        }
        map.end()
    }
}

/// A timestamped target pose. `time` is in milliseconds from clip start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Keyframe {
    pub time: f64,
    #[serde(rename = "data")]
    pub pose: Pose,
}

impl Keyframe {
    pub fn new(time: f64, pose: Pose) -> Self {
        Self { time, pose }
    }

    /// This frame with its timestamp and angles rounded to 3 decimals.
    pub fn rounded(&self) -> Self {
        Self {
            time: round3(self.time),
            pose: self.pose.map(|_, angle| round3(angle)),
        }
    }
}

/// Rounds to 3 decimal places.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
