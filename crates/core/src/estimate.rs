use std::time::Duration;

/// Default speaking rate used by [`SpeechEstimator`].
pub const DEFAULT_SECONDS_PER_WORD: f64 = 0.4;

/// Word-count heuristic for how long the robot will take to say something.
///
/// Speech backends do not report duration up front, so this serves as an upper
/// bound on how long a gesture loop may keep running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechEstimator {
    pub seconds_per_word: f64,
}

impl SpeechEstimator {
    pub fn new(seconds_per_word: f64) -> Self {
        Self { seconds_per_word }
    }

    pub fn estimate(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count();
        Duration::try_from_secs_f64((words as f64 * self.seconds_per_word).max(0.0))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for SpeechEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SECONDS_PER_WORD)
    }
}
