//! Gesture synthesis and speech/motion coordination for a social robot, plus
//! the language-model oracle used by its word-guessing game.

pub mod backend;
pub mod coordinator;
pub mod estimate;
pub mod generate;
pub mod keyframe;
pub mod library;
pub mod oracle;
pub mod smoothing;

pub use backend::{MotionDispatcher, PlaybackMode, SpeechBackend, SpeechHandle};
pub use coordinator::{
    BEAT_GESTURE, CoordinatorSettings, GestureCoordinator, GestureOutcome, GesturePath, LoopExit,
};
pub use estimate::SpeechEstimator;
pub use keyframe::{Joint, JointLimits, Keyframe, Pose};
pub use library::{GestureLibrary, LibraryError};
pub use oracle::{Answer, BoundedOracle, GameOracle, OpenAIOracle, QuestionRound};
