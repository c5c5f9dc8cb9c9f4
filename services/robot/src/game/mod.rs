//! Word-Guessing Game
//!
//! Conversation flow on top of the gesture coordinator:
//!
//! - `response`: prompting the user and collecting what they say.
//! - `robot_guesses`: the user thinks of a word, the robot asks questions.
//! - `user_guesses`: the robot picks a word, the user asks questions.
//!
//! A failed speech or motion call loses only that utterance; the game logs it
//! and carries on with the next step.

mod response;
mod robot_guesses;
mod user_guesses;

pub use response::{clean_response, has_word, normalize};
pub use robot_guesses::RobotGuessOutcome;
pub use user_guesses::UserGuessOutcome;

use crate::stt::TranscriptSource;
use riddler_core::{BEAT_GESTURE, BoundedOracle, GestureCoordinator};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

pub const GOODBYE_WAVE: &str = "goodbye_wave";
pub const THINKING: &str = "thinking";
pub const CELEBRATION: &str = "celebration";
pub const DEFEAT: &str = "defeat";
pub const NOD_YES: &str = "nod_yes";
pub const SHAKE_NO: &str = "shake_no";

/// Timing and length limits of the game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    /// How long to wait for a reply to a spoken prompt.
    pub response_timeout: Duration,
    /// How long to wait for a question or answer during a round.
    pub round_timeout: Duration,
    pub poll_interval: Duration,
    /// Pause after speaking a prompt before listening.
    pub post_prompt_pause: Duration,
    /// Time given to the user to think of a word.
    pub think_pause: Duration,
    pub ready_retry_pause: Duration,
    /// Pause after the robot asks a question before listening for feedback.
    pub answer_pause: Duration,
    pub mode_prompt_pause: Duration,
    pub intro_pause: Duration,
    pub max_ready_prompts: usize,
    pub robot_guess_rounds: usize,
    pub user_guess_rounds: usize,
    /// Consecutive silent turns after which the user-guesses game ends.
    pub max_silent_turns: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(15),
            round_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_secs(1),
            post_prompt_pause: Duration::from_millis(1500),
            think_pause: Duration::from_secs(5),
            ready_retry_pause: Duration::from_secs(3),
            answer_pause: Duration::from_secs(5),
            mode_prompt_pause: Duration::from_secs(2),
            intro_pause: Duration::from_millis(1500),
            max_ready_prompts: 10,
            robot_guess_rounds: 7,
            user_guess_rounds: 15,
            max_silent_turns: 5,
        }
    }
}

/// Who guesses the secret word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    RobotGuesses,
    UserGuesses,
}

impl GameMode {
    /// "I guess" picks the user as guesser; anything else lets the robot guess.
    pub fn from_reply(reply: Option<&str>) -> Self {
        match reply.map(normalize) {
            Some(text) if text.contains("i guess") => GameMode::UserGuesses,
            _ => GameMode::RobotGuesses,
        }
    }
}

/// One game session with a user.
pub struct Game {
    coordinator: Arc<GestureCoordinator>,
    oracle: BoundedOracle,
    listener: Arc<dyn TranscriptSource>,
    settings: GameSettings,
}

impl Game {
    pub fn new(
        coordinator: Arc<GestureCoordinator>,
        oracle: BoundedOracle,
        listener: Arc<dyn TranscriptSource>,
    ) -> Self {
        Self {
            coordinator,
            oracle,
            listener,
            settings: GameSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: GameSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Speaks `text` with `gesture`. Returns `false` if the turn was lost.
    pub async fn say(&self, text: &str, gesture: Option<&str>) -> bool {
        match self.coordinator.speak_and_gesture(text, gesture).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = ?e, text, "Speech turn failed; continuing");
                false
            }
        }
    }

    /// Runs games until the user declines to play (again).
    pub async fn play(&self) {
        loop {
            info!("Starting new game");
            self.say("Hello there!", Some(GOODBYE_WAVE)).await;
            let invitation = self
                .wait_for_response(
                    Some("Do you want to play a game? Please say Yes or No."),
                    self.settings.response_timeout,
                )
                .await;
            info!(reply = ?invitation, "Invitation reply");
            if invitation.as_deref().is_none_or(|r| has_word(r, "no")) {
                self.say("Okay, maybe next time!", None).await;
                self.say("Goodbye!", Some(GOODBYE_WAVE)).await;
                info!("User declined to play");
                return;
            }

            self.say(
                "Great! Would you like me to guess your word, or would you like to guess my word? \
                 Please say 'I guess' if you want to guess my word, or 'You guess' if you want me to guess yours.",
                Some(BEAT_GESTURE),
            )
            .await;
            sleep(self.settings.mode_prompt_pause).await;
            self.say("When you are ready", Some(THINKING)).await;
            let mode_reply = self
                .wait_for_response(Some("Please choose the game mode."), self.settings.response_timeout)
                .await;
            let mode = GameMode::from_reply(mode_reply.as_deref());
            info!(reply = ?mode_reply, ?mode, "Game mode selected");

            match mode {
                GameMode::RobotGuesses => {
                    self.play_robot_guesses().await;
                }
                GameMode::UserGuesses => {
                    self.play_user_guesses().await;
                }
            }

            let again = self
                .wait_for_response(
                    Some("Do you want to play another game? Please say Yes or No."),
                    self.settings.response_timeout,
                )
                .await;
            self.say("", Some(THINKING)).await;
            if !again.as_deref().is_some_and(|r| has_word(r, "yes")) {
                self.say("Okay, thanks for playing!", None).await;
                self.say("", Some(GOODBYE_WAVE)).await;
                info!("User chose to end the session");
                return;
            }
        }
    }
}
