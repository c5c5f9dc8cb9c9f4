//! Gesture Library
//!
//! Immutable registry of pre-authored gesture clips, built once at startup from
//! a JSON file of the form
//! `{ "<name>": { "keyframes": [ { "time": <ms>, "data": { "<joint>": <rad> } } ] } }`.

use crate::keyframe::{Joint, Keyframe, Pose};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, error, warn};

/// Failure to build a library from its source file.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Could not read gesture library {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not parse gesture library: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct RawGesture {
    #[serde(default)]
    keyframes: Vec<RawKeyframe>,
}

#[derive(Deserialize)]
struct RawKeyframe {
    time: f64,
    #[serde(default)]
    data: BTreeMap<String, f64>,
}

/// Named, fixed keyframe clips.
#[derive(Debug, Clone, Default)]
pub struct GestureLibrary {
    gestures: HashMap<String, Vec<Keyframe>>,
}

impl GestureLibrary {
    /// A library with no gestures; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads and validates the library at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| LibraryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Like [`GestureLibrary::load`], but degrades to an empty library on failure.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(library) => library,
            Err(e) => {
                error!(error = %e, "Gesture library unavailable; only beat gestures will play");
                Self::empty()
            }
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, LibraryError> {
        let raw: BTreeMap<String, RawGesture> = serde_json::from_str(text)?;
        let mut gestures = HashMap::with_capacity(raw.len());
        for (name, gesture) in raw {
            if let Some(frames) = convert_clip(&name, gesture.keyframes) {
                gestures.insert(name, frames);
            }
        }
        let mut names: Vec<_> = gestures.keys().collect();
        names.sort();
        debug!(gestures = ?names, "Loaded gesture library");
        Ok(Self { gestures })
    }

    pub fn get(&self, name: &str) -> Option<&[Keyframe]> {
        self.gestures.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.gestures.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.gestures.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.gestures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty()
    }
}

/// Longest clip accepted, in milliseconds.
pub const MAX_CLIP_MS: f64 = 60_000.0;

fn convert_clip(name: &str, raw: Vec<RawKeyframe>) -> Option<Vec<Keyframe>> {
    let mut frames = Vec::with_capacity(raw.len());
    let mut last_time = 0.0;
    for frame in raw {
        if frame.time < last_time || !frame.time.is_finite() {
            warn!(gesture = %name, time = frame.time, "Rejecting gesture with out-of-order timestamps");
            return None;
        }
        if frame.time > MAX_CLIP_MS {
            warn!(gesture = %name, time = frame.time, max_ms = MAX_CLIP_MS, "Rejecting overlong gesture");
            return None;
        }
        last_time = frame.time;

        let mut pose = Pose::empty();
        for (joint_name, angle) in frame.data {
            let Some(joint) = Joint::from_name(&joint_name) else {
                warn!(gesture = %name, joint = %joint_name, "Dropping unknown joint");
                continue;
            };
            let limits = joint.limits();
            if !limits.contains(angle) {
                warn!(gesture = %name, %joint, angle, "Clamping angle to joint limits");
            }
            pose.set(joint, limits.clamp(angle));
        }
        frames.push(Keyframe::new(frame.time, pose));
    }
    Some(frames)
}
