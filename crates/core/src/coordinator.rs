//! Gesture Loop Coordinator
//!
//! Pairs one speech act with body motion. Depending on the gesture tag the
//! coordinator either loops freshly generated beat gestures while the robot is
//! talking, plays a library clip once, or just talks.
//!
//! The robot does not report how long an utterance will take, so the beat loop
//! stops on whichever comes first: the speech handle completing, or the
//! word-count estimate running out. Both are checked only between motion
//! cycles. The caller always gets control back after speech has finished.

use crate::{
    backend::{MotionDispatcher, PlaybackMode, SpeechBackend, SpeechHandle},
    estimate::SpeechEstimator,
    generate::generate_beat_frames,
    keyframe::Keyframe,
    library::GestureLibrary,
    smoothing::smooth,
};
use anyhow::Result;
use rand::{SeedableRng, rngs::StdRng};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// Tag selecting the procedurally generated beat gesture.
pub const BEAT_GESTURE: &str = "beat_gesture";

/// Tunables for gesture playback.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorSettings {
    /// Length of each generated beat clip, in milliseconds.
    pub beat_duration_ms: f64,
    /// Amplitude scale passed to the beat generator.
    pub beat_amplitude: f64,
    pub beat_smoothing_steps: usize,
    pub library_smoothing_steps: usize,
    /// Pause between beat dispatches.
    pub motion_cycle: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            beat_duration_ms: 1000.0,
            beat_amplitude: 0.5,
            beat_smoothing_steps: 1,
            library_smoothing_steps: 1,
            motion_cycle: Duration::from_secs(1),
        }
    }
}

/// Which motion accompanied a speech act.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePath {
    /// Beat gestures looped while speaking.
    BeatLoop,
    /// A library clip played once.
    LibraryOnce,
    /// No motion.
    SpeechOnly,
}

/// Why a beat loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    SpeechFinished,
    BudgetExhausted,
}

/// Summary of one [`GestureCoordinator::speak_and_gesture`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureOutcome {
    pub path: GesturePath,
    /// Number of motion dispatch calls issued.
    pub dispatches: usize,
    pub loop_exit: Option<LoopExit>,
    /// Estimated speaking time for the text.
    pub budget: Duration,
}

enum GesturePlan<'a> {
    Beat,
    Clip(&'a [Keyframe]),
    None,
}

/// Runs speech acts with synchronized gestures.
pub struct GestureCoordinator {
    speech: Arc<dyn SpeechBackend>,
    motion: Arc<dyn MotionDispatcher>,
    library: Arc<GestureLibrary>,
    estimator: SpeechEstimator,
    settings: CoordinatorSettings,
    rng: Mutex<StdRng>,
}

impl GestureCoordinator {
    pub fn new(
        speech: Arc<dyn SpeechBackend>,
        motion: Arc<dyn MotionDispatcher>,
        library: Arc<GestureLibrary>,
    ) -> Self {
        Self {
            speech,
            motion,
            library,
            estimator: SpeechEstimator::default(),
            settings: CoordinatorSettings::default(),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_estimator(mut self, estimator: SpeechEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_settings(mut self, settings: CoordinatorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Uses a deterministic random source for beat generation and jitter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Says `text` while performing the gesture named by `gesture`.
    ///
    /// Speech or motion backend failures are returned to the caller; an unknown
    /// gesture only downgrades to plain speech.
    pub async fn speak_and_gesture(&self, text: &str, gesture: Option<&str>) -> Result<GestureOutcome> {
        let start = Instant::now();
        let handle = self.speech.speak(text).await?;
        let budget = self.estimator.estimate(text);
        debug!(text, gesture, budget_secs = budget.as_secs_f64(), "Speaking");

        let mut outcome = GestureOutcome {
            path: GesturePath::SpeechOnly,
            dispatches: 0,
            loop_exit: None,
            budget,
        };

        match self.plan(gesture) {
            GesturePlan::Beat => {
                let (dispatches, exit) = self.run_beat_loop(&handle, start, budget).await?;
                outcome.path = GesturePath::BeatLoop;
                outcome.dispatches = dispatches;
                outcome.loop_exit = Some(exit);
            }
            GesturePlan::Clip(frames) => {
                self.play_clip_once(frames).await?;
                outcome.path = GesturePath::LibraryOnce;
                outcome.dispatches = 1;
            }
            GesturePlan::None => {}
        }

        handle.wait().await?;
        debug!(?outcome, elapsed_secs = start.elapsed().as_secs_f64(), "Speech finished");
        Ok(outcome)
    }

    fn plan(&self, gesture: Option<&str>) -> GesturePlan<'_> {
        let Some(name) = gesture else {
            return GesturePlan::None;
        };
        if name == BEAT_GESTURE {
            return GesturePlan::Beat;
        }
        match self.library.get(name) {
            Some([]) => {
                warn!(gesture = name, "Gesture has no keyframes; skipping motion");
                GesturePlan::None
            }
            Some(frames) => GesturePlan::Clip(frames),
            None => {
                warn!(gesture = name, "Gesture not found; skipping motion");
                GesturePlan::None
            }
        }
    }

    async fn run_beat_loop(
        &self,
        handle: &SpeechHandle,
        start: Instant,
        budget: Duration,
    ) -> Result<(usize, LoopExit)> {
        let mut dispatches = 0;
        let exit = loop {
            if handle.is_done() {
                break LoopExit::SpeechFinished;
            }

            let frames = {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                let beat = generate_beat_frames(
                    &mut *rng,
                    self.settings.beat_duration_ms,
                    self.settings.beat_amplitude,
                );
                smooth(&mut *rng, &beat, self.settings.beat_smoothing_steps)
            };

            let elapsed = start.elapsed();
            if elapsed >= budget {
                break LoopExit::BudgetExhausted;
            }

            self.motion
                .dispatch(&frames, PlaybackMode::Linear, false, true)
                .await?;
            dispatches += 1;
            debug!(
                iteration = dispatches,
                elapsed_secs = elapsed.as_secs_f64(),
                "Dispatched beat gesture"
            );

            sleep(self.settings.motion_cycle).await;
        };

        debug!(?exit, dispatches, "Beat loop finished");
        Ok((dispatches, exit))
    }

    async fn play_clip_once(&self, frames: &[Keyframe]) -> Result<()> {
        let frames = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            smooth(&mut *rng, frames, self.settings.library_smoothing_steps)
        };
        self.motion
            .dispatch(&frames, PlaybackMode::Last, false, true)
            .await?;

        let clip_ms = frames.last().map_or(0.0, |f| f.time).max(0.0);
        let clip = Duration::try_from_secs_f64(clip_ms / 1000.0).unwrap_or_else(|_| {
            warn!(clip_ms, "Clip length out of range; not waiting for it");
            Duration::ZERO
        });
        sleep(clip).await;
        Ok(())
    }
}
