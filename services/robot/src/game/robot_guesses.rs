//! The user thinks of a word; the robot asks yes/no questions to find it.

use super::{CELEBRATION, DEFEAT, GOODBYE_WAVE, Game, has_word, normalize};
use riddler_core::{BEAT_GESTURE, QuestionRound};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Replies that confirm the robot found the word, after normalization.
const WIN_PHRASES: [&str; 4] = ["that is correct", "yes thats it", "exactly", "yes you guessed it"];

const NO_RESPONSE: &str = "No response";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotGuessOutcome {
    pub guessed: bool,
    pub rounds: Vec<QuestionRound>,
}

fn confirms_guess(feedback: &str) -> bool {
    let cleaned = normalize(feedback);
    WIN_PHRASES.iter().any(|phrase| cleaned.contains(phrase))
}

impl Game {
    pub async fn play_robot_guesses(&self) -> RobotGuessOutcome {
        info!("Robot-guesses game started");
        let mut outcome = RobotGuessOutcome {
            guessed: false,
            rounds: Vec::new(),
        };

        self.say("Great! Please think of a word and keep it in your mind.", Some(BEAT_GESTURE))
            .await;
        sleep(self.settings.think_pause).await;

        if !self.wait_until_ready().await {
            self.say("Let's try again another time.", None).await;
            return outcome;
        }
        self.say("Let's start!", None).await;

        let mut last_feedback = String::new();
        for round in 1..=self.settings.robot_guess_rounds {
            let question = self
                .oracle
                .propose_next_question(&outcome.rounds, &last_feedback)
                .await
                .replace(['<', '>'], "")
                .trim()
                .to_string();
            debug!(round, %question, "Asking");
            self.say(&question, Some(BEAT_GESTURE)).await;
            sleep(self.settings.answer_pause).await;

            let feedback = self
                .wait_for_response(None, self.settings.round_timeout)
                .await
                .unwrap_or_else(|| NO_RESPONSE.to_string());
            debug!(round, %feedback, "Feedback");
            outcome.rounds.push(QuestionRound {
                question,
                feedback: feedback.clone(),
            });

            if confirms_guess(&feedback) {
                outcome.guessed = true;
                self.say("Yay! I guessed it!", Some(CELEBRATION)).await;
                break;
            }
            last_feedback = feedback;
        }

        if !outcome.guessed {
            self.say("I give up! That was a challenging word.", Some(DEFEAT)).await;
        }
        info!(guessed = outcome.guessed, rounds = outcome.rounds.len(), "Robot-guesses game over");
        self.say("Thanks for playing!", Some(GOODBYE_WAVE)).await;
        outcome
    }

    /// Asks until the user says yes. Gives up after `max_ready_prompts` tries.
    async fn wait_until_ready(&self) -> bool {
        for attempt in 1..=self.settings.max_ready_prompts {
            let reply = self
                .wait_for_response(
                    Some("Are you ready? Please say Yes when you are."),
                    self.settings.round_timeout,
                )
                .await;
            if reply.as_deref().is_some_and(|r| has_word(r, "yes")) {
                return true;
            }
            debug!(attempt, reply = ?reply, "User not ready");
            self.say("Okay, waiting until you're ready...", None).await;
            sleep(self.settings.ready_retry_pause).await;
        }
        warn!("User never became ready");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::GameSettings;
    use super::*;
    use riddler_core::oracle::FALLBACK_QUESTION;
    use std::sync::{Arc, Mutex};

    fn questions(qs: &[&str]) -> Mutex<std::collections::VecDeque<String>> {
        Mutex::new(qs.iter().map(|q| q.to_string()).collect())
    }

    #[test]
    fn test_win_phrases() {
        assert!(confirms_guess("Yes, that's it!"));
        assert!(confirms_guess("EXACTLY"));
        assert!(confirms_guess("yes you guessed it"));
        assert!(!confirms_guess("yes"));
        assert!(!confirms_guess("No response"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_robot_gives_up_after_round_limit() {
        let speech = Arc::new(RecordingSpeech::default());
        let oracle = Arc::new(ScriptedOracle {
            questions: questions(&["Is it <alive>?", "Is it big?"]),
            ..Default::default()
        });
        let user = Arc::new(ScriptedUser::new(&["yes", "no", ""]));
        let game = game(speech.clone(), oracle, user).with_settings(GameSettings {
            robot_guess_rounds: 2,
            ..fast_settings()
        });

        let outcome = game.play_robot_guesses().await;

        assert!(!outcome.guessed);
        assert_eq!(
            outcome.rounds,
            vec![
                QuestionRound { question: "Is it alive?".into(), feedback: "no".into() },
                QuestionRound { question: "Is it big?".into(), feedback: NO_RESPONSE.into() },
            ]
        );
        let said = said(&speech);
        assert!(said.contains(&"I give up! That was a challenging word.".to_string()));
        assert_eq!(said.last().map(String::as_str), Some("Thanks for playing!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_is_asked_again() {
        let speech = Arc::new(RecordingSpeech::default());
        let oracle = Arc::new(ScriptedOracle {
            questions: questions(&["Is it a fruit?"]),
            ..Default::default()
        });
        let user = Arc::new(ScriptedUser::new(&["", "not yet", "yes", "exactly"]));
        let game = game(speech.clone(), oracle, user);

        let outcome = game.play_robot_guesses().await;

        assert!(outcome.guessed);
        let said = said(&speech);
        let waits = said
            .iter()
            .filter(|s| s.as_str() == "Okay, waiting until you're ready...")
            .count();
        assert_eq!(waits, 2);
        assert!(said.contains(&"Yay! I guessed it!".to_string()));
        assert!(!said.contains(&"I give up! That was a challenging word.".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_never_ready() {
        let speech = Arc::new(RecordingSpeech::default());
        let oracle = Arc::new(ScriptedOracle::default());
        let user = Arc::new(ScriptedUser::new(&[]));
        let game = game(speech.clone(), oracle.clone(), user).with_settings(GameSettings {
            max_ready_prompts: 3,
            ..fast_settings()
        });

        let outcome = game.play_robot_guesses().await;

        assert!(!outcome.guessed);
        assert!(outcome.rounds.is_empty());
        assert!(oracle.seen_rounds.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oracle_failure_uses_fallback_question() {
        let speech = Arc::new(RecordingSpeech::default());
        let user = Arc::new(ScriptedUser::new(&["yes", "that is correct"]));
        let game = game(speech.clone(), Arc::new(ScriptedOracle::default()), user);

        let outcome = game.play_robot_guesses().await;

        assert!(outcome.guessed);
        assert_eq!(outcome.rounds[0].question, FALLBACK_QUESTION);
        assert!(said(&speech).contains(&FALLBACK_QUESTION.to_string()));
    }
}
