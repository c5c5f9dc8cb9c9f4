//! Speech and motion boundaries.
//!
//! These traits decouple gesture coordination from whatever actually drives the
//! robot, so the same coordinator runs against a live session or a test fake.

use crate::keyframe::Keyframe;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use tokio::task::JoinHandle;

/// Completion signal for an in-flight speech act.
///
/// Can be polled without blocking via [`SpeechHandle::is_done`] and awaited via
/// [`SpeechHandle::wait`], which also surfaces the backend's error.
#[derive(Debug)]
pub struct SpeechHandle {
    task: JoinHandle<Result<()>>,
}

impl SpeechHandle {
    /// Runs `speech` as its own task and returns a handle to it.
    pub fn spawn<F>(speech: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            task: tokio::spawn(speech),
        }
    }

    /// A handle that is already complete.
    pub fn finished() -> Self {
        Self::spawn(async { Ok(()) })
    }

    pub fn is_done(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn wait(self) -> Result<()> {
        self.task.await.context("Speech task did not run to completion")?
    }
}

/// Something that can say text out loud.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Starts speaking `text` and returns as soon as the act is issued.
    async fn speak(&self, text: &str) -> Result<SpeechHandle>;
}

/// How the robot moves between the frames of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Interpolate linearly between consecutive frames.
    Linear,
    /// Only the time of the last frame constrains playback.
    Last,
}

impl PlaybackMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackMode::Linear => "linear",
            PlaybackMode::Last => "last",
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executes keyframe sequences on the robot.
#[async_trait]
pub trait MotionDispatcher: Send + Sync {
    /// Submits `frames` for playback.
    ///
    /// With `synchronous == false` the robot starts the clip and the call
    /// returns once it is accepted. `force` preempts a clip already playing.
    async fn dispatch(
        &self,
        frames: &[Keyframe],
        mode: PlaybackMode,
        synchronous: bool,
        force: bool,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_handle_reports_completion() {
        let handle = SpeechHandle::spawn(async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        });
        assert!(!handle.is_done());
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(handle.is_done());
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_surfaces_backend_error() {
        let handle = SpeechHandle::spawn(async { Err(anyhow::anyhow!("speaker offline")) });
        let err = handle.wait().await.unwrap_err();
        assert!(err.to_string().contains("speaker offline"));
    }

    #[test]
    fn test_playback_mode_wire_names() {
        assert_eq!(serde_json::to_value(PlaybackMode::Linear).unwrap(), "linear");
        assert_eq!(PlaybackMode::Last.to_string(), "last");
    }
}
