//! Prompting the user and collecting their reply.

use super::Game;
use riddler_core::BEAT_GESTURE;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Replies longer than this are cut to their first word.
const MAX_REPLY_CHARS: usize = 50;

impl Game {
    /// Optionally speaks `prompt`, then polls for words until `timeout`.
    ///
    /// Words heard before listening starts are discarded, so the robot's own
    /// prompt is never taken as the reply.
    pub async fn wait_for_response(&self, prompt: Option<&str>, timeout: Duration) -> Option<String> {
        self.listener.clear();
        if let Some(prompt) = prompt {
            self.say(prompt, Some(BEAT_GESTURE)).await;
            sleep(self.settings.post_prompt_pause).await;
            self.listener.clear();
        }

        let poll = self.settings.poll_interval.max(Duration::from_millis(1));
        let mut waited = Duration::ZERO;
        while waited < timeout {
            sleep(poll).await;
            waited += poll;
            if let Some(words) = self.listener.take_words() {
                let reply = clean_response(&words);
                if !reply.is_empty() {
                    debug!(%reply, "User replied");
                    return Some(reply);
                }
            }
        }
        debug!(timeout_secs = timeout.as_secs_f64(), "No reply");
        None
    }
}

/// Joins recognized words and strips recognizer markup such as `<unk>`
/// brackets. Overlong replies collapse to their first word.
pub fn clean_response(words: &[String]) -> String {
    let joined = words.join(" ");
    let stripped: String = joined.chars().filter(|c| *c != '<' && *c != '>').collect();
    let stripped = stripped.trim();
    if stripped.chars().count() > MAX_REPLY_CHARS {
        stripped.split_whitespace().next().unwrap_or_default().to_string()
    } else {
        stripped.to_string()
    }
}

/// Lowercases and drops punctuation, keeping letters, digits and spaces.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether `word` appears in `text` as a whole word, ignoring case and
/// punctuation.
pub fn has_word(text: &str, word: &str) -> bool {
    let word = normalize(word);
    normalize(text).split_whitespace().any(|w| w == word)
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_clean_strips_brackets() {
        assert_eq!(clean_response(&words("<yes>")), "yes");
        assert_eq!(clean_response(&words("is it <a> dog")), "is it a dog");
        assert_eq!(clean_response(&words("<>")), "");
    }

    #[test]
    fn test_clean_truncates_long_replies() {
        let long = "absolutely definitely certainly without any doubt whatsoever yes";
        assert!(long.len() > MAX_REPLY_CHARS);
        assert_eq!(clean_response(&words(long)), "absolutely");
    }

    #[test]
    fn test_has_word() {
        assert!(has_word("No, thank you.", "no"));
        assert!(has_word("YES!", "yes"));
        assert!(!has_word("I don't know", "no"));
        assert!(!has_word("not now", "no"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Yes, that's it!"), "yes thats it");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_on_silence() {
        let speech = Arc::new(RecordingSpeech::default());
        let user = Arc::new(ScriptedUser::new(&[]));
        let game = game(speech.clone(), Arc::new(ScriptedOracle::default()), user);

        let start = Instant::now();
        let reply = game.wait_for_response(None, Duration::from_secs(3)).await;
        assert_eq!(reply, None);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_millis(3100));
        assert!(said(&speech).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_speaks_prompt_and_skips_empty_polls() {
        let speech = Arc::new(RecordingSpeech::default());
        let user = Arc::new(ScriptedUser::new(&["", "<>", "you guess"]));
        let game = game(speech.clone(), Arc::new(ScriptedOracle::default()), user);

        let reply = game
            .wait_for_response(Some("Please choose the game mode."), Duration::from_secs(5))
            .await;
        assert_eq!(reply.as_deref(), Some("you guess"));
        assert_eq!(said(&speech), vec!["Please choose the game mode.".to_string()]);
    }
}
