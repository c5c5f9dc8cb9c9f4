//! The robot picks a secret word; the user asks yes/no questions to find it.

use super::{CELEBRATION, Game, NOD_YES, SHAKE_NO};
use riddler_core::{Answer, BEAT_GESTURE};
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGuessOutcome {
    pub secret: String,
    pub guessed: bool,
    /// Questions the robot answered.
    pub questions: usize,
}

fn answer_gesture(answer: Answer) -> &'static str {
    match answer {
        Answer::Yes => NOD_YES,
        Answer::No => SHAKE_NO,
        Answer::Unknown => BEAT_GESTURE,
    }
}

impl Game {
    pub async fn play_user_guesses(&self) -> UserGuessOutcome {
        let secret = self.oracle.pick_secret_word().await;
        info!(%secret, "User-guesses game started");
        let secret_lower = secret.to_lowercase();
        let mut outcome = UserGuessOutcome {
            secret,
            guessed: false,
            questions: 0,
        };

        self.say(
            "I have chosen a word. Ask me yes/no questions to narrow it down.",
            Some(BEAT_GESTURE),
        )
        .await;
        sleep(self.settings.intro_pause).await;

        let mut silent_turns = 0;
        let mut went_quiet = false;
        while outcome.questions < self.settings.user_guess_rounds {
            let Some(input) = self.wait_for_response(None, self.settings.round_timeout).await else {
                silent_turns += 1;
                if silent_turns >= self.settings.max_silent_turns {
                    warn!(silent_turns, "User went quiet; ending game");
                    went_quiet = true;
                    break;
                }
                self.say("I didn't catch that. Please try again.", Some(SHAKE_NO)).await;
                continue;
            };
            silent_turns = 0;
            debug!(%input, "User asked");

            if input.to_lowercase().contains(&secret_lower) {
                outcome.guessed = true;
                self.say("Congratulations! You guessed it!", Some(CELEBRATION)).await;
                break;
            }

            let answer = self.oracle.answer_yes_no(&outcome.secret, &input).await;
            debug!(%answer, "Answering");
            self.say(answer.as_speech(), Some(answer_gesture(answer))).await;
            outcome.questions += 1;
        }

        if went_quiet {
            self.say(
                &format!("It seems you've gone quiet, so let's stop here. The word was {}.", outcome.secret),
                Some(SHAKE_NO),
            )
            .await;
        } else if !outcome.guessed {
            self.say(
                &format!("Sorry, you've run out of rounds. The word was {}.", outcome.secret),
                Some(SHAKE_NO),
            )
            .await;
        }
        info!(guessed = outcome.guessed, questions = outcome.questions, "User-guesses game over");
        self.say("Thanks for playing!", Some(BEAT_GESTURE)).await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::super::GameSettings;
    use super::super::testing::*;
    use super::*;
    use std::sync::Arc;

    fn oracle(secret: &str, answer: Option<Answer>) -> Arc<ScriptedOracle> {
        Arc::new(ScriptedOracle {
            secret: secret.to_string(),
            answer,
            ..Default::default()
        })
    }

    #[test]
    fn test_answer_gestures() {
        assert_eq!(answer_gesture(Answer::Yes), NOD_YES);
        assert_eq!(answer_gesture(Answer::No), SHAKE_NO);
        assert_eq!(answer_gesture(Answer::Unknown), BEAT_GESTURE);
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_guesses_word() {
        let speech = Arc::new(RecordingSpeech::default());
        let user = Arc::new(ScriptedUser::new(&["", "is it a fruit", "is it an Apple"]));
        let game = game(speech.clone(), oracle("apple", Some(Answer::Yes)), user);

        let outcome = game.play_user_guesses().await;

        assert_eq!(
            outcome,
            UserGuessOutcome { secret: "apple".into(), guessed: true, questions: 1 }
        );
        let said = said(&speech);
        assert!(said.contains(&"I didn't catch that. Please try again.".to_string()));
        assert!(said.contains(&"yes".to_string()));
        assert!(said.contains(&"Congratulations! You guessed it!".to_string()));
        assert_eq!(said.last().map(String::as_str), Some("Thanks for playing!"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_rounds_reveals_word() {
        let speech = Arc::new(RecordingSpeech::default());
        let user = Arc::new(ScriptedUser::new(&["is it red", "is it big"]));
        let game = game(speech.clone(), oracle("house", None), user).with_settings(GameSettings {
            user_guess_rounds: 2,
            ..fast_settings()
        });

        let outcome = game.play_user_guesses().await;

        assert!(!outcome.guessed);
        assert_eq!(outcome.questions, 2);
        let said = said(&speech);
        assert_eq!(said.iter().filter(|s| s.as_str() == "I don't know").count(), 2);
        assert!(said.contains(&"Sorry, you've run out of rounds. The word was house.".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_ends_game() {
        let speech = Arc::new(RecordingSpeech::default());
        let user = Arc::new(ScriptedUser::new(&[]));
        let game = game(speech.clone(), oracle("cat", Some(Answer::No)), user).with_settings(GameSettings {
            max_silent_turns: 3,
            ..fast_settings()
        });

        let outcome = game.play_user_guesses().await;

        assert!(!outcome.guessed);
        assert_eq!(outcome.questions, 0);
        let retries = said(&speech)
            .iter()
            .filter(|s| s.as_str() == "I didn't catch that. Please try again.")
            .count();
        assert_eq!(retries, 2);
        let said = said(&speech);
        assert!(said.contains(
            &"It seems you've gone quiet, so let's stop here. The word was cat.".to_string()
        ));
        assert!(!said.iter().any(|s| s.contains("run out of rounds")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_secret_falls_back() {
        let speech = Arc::new(RecordingSpeech::default());
        let user = Arc::new(ScriptedUser::new(&["apple?"]));
        let game = game(speech, oracle("  ", None), user);

        let outcome = game.play_user_guesses().await;
        assert_eq!(outcome.secret, riddler_core::oracle::FALLBACK_SECRET_WORD);
        assert!(outcome.guessed);
    }
}
