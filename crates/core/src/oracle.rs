//! Word-Game Oracle
//!
//! The language-model side of the guessing game: asking the next yes/no
//! question, answering questions about a secret word, and picking that word.
//! [`BoundedOracle`] wraps any backend so each call has a deadline and a fixed
//! fallback, which keeps a slow or failing model from stalling a turn.

use anyhow::{Context, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Spoken when no question could be generated.
pub const FALLBACK_QUESTION: &str = "I'm sorry, I couldn't generate a question.";
/// Secret word used when the model cannot pick one.
pub const FALLBACK_SECRET_WORD: &str = "apple";

/// One question the robot asked and what the user said back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRound {
    pub question: String,
    pub feedback: String,
}

/// Reply to a yes/no question about the secret word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Unknown,
}

impl Answer {
    /// Reads a model reply. Only a leading "yes" or "no" counts.
    pub fn parse(reply: &str) -> Self {
        let first = reply
            .split_whitespace()
            .next()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase());
        match first.as_deref() {
            Some("yes") => Answer::Yes,
            Some("no") => Answer::No,
            _ => Answer::Unknown,
        }
    }

    /// What the robot says for this answer.
    pub fn as_speech(self) -> &'static str {
        match self {
            Answer::Yes => "yes",
            Answer::No => "no",
            Answer::Unknown => "I don't know",
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_speech())
    }
}

/// The language-model operations the game relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GameOracle: Send + Sync {
    /// Proposes the next yes/no question to narrow down the user's word.
    async fn propose_next_question(&self, rounds: &[QuestionRound], last_feedback: &str) -> Result<String>;

    /// Answers `question` truthfully about `secret`.
    async fn answer_yes_no(&self, secret: &str, question: &str) -> Result<Answer>;

    /// Picks a simple secret word for the user to guess.
    async fn pick_secret_word(&self) -> Result<String>;
}

/// Builds the prompt for the next question from the game so far.
pub fn build_question_prompt(rounds: &[QuestionRound], last_feedback: &str) -> String {
    let mut prompt = String::from(
        "You are a guessing game assistant. The player is thinking of a word, \
         and your goal is to guess it by asking yes/no questions. \
         Use the feedback from previous rounds to refine your questions.\n\n\
         Previous rounds:\n",
    );
    if rounds.is_empty() {
        prompt.push_str("None\n");
    } else {
        for (idx, round) in rounds.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. Question: {} | Feedback: {}\n",
                idx + 1,
                round.question,
                round.feedback
            ));
        }
    }
    if !last_feedback.is_empty() {
        prompt.push_str(&format!("\nThe latest user response was: \"{last_feedback}\"\n"));
    }
    prompt.push_str(
        "\nBased on this context, propose your next yes/no question to narrow down the word. \
         Output only the question enclosed between <<< and >>>. For example:\n\
         <<<Is it an animal?>>>\n",
    );
    prompt
}

/// Pulls the question out of `<<< >>>` markers and strips stray angle brackets.
pub fn extract_question(reply: &str) -> String {
    let inner = reply
        .find("<<<")
        .and_then(|open| {
            let rest = &reply[open + 3..];
            rest.find(">>>").map(|close| &rest[..close])
        })
        .unwrap_or(reply);
    inner.replace(['<', '>'], "").trim().to_string()
}

/// A [`GameOracle`] backed by an OpenAI-compatible chat completions API.
pub struct OpenAIOracle {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIOracle {
    /// # Arguments
    ///
    /// * `config` - API key and base URL of the provider.
    /// * `model` - Chat model identifier (e.g., "gpt-4o-mini").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }

    async fn complete(&self, prompt: String, max_tokens: u32, temperature: f32) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into(),
            ])
            .max_completion_tokens(max_tokens)
            .temperature(temperature)
            .build()?;

        let response = self.client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .context("No response choice from LLM")?
            .message
            .content
            .as_ref()
            .context("No content in LLM response")?;
        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl GameOracle for OpenAIOracle {
    async fn propose_next_question(&self, rounds: &[QuestionRound], last_feedback: &str) -> Result<String> {
        let prompt = build_question_prompt(rounds, last_feedback);
        debug!(%prompt, "Requesting next question");
        let reply = self.complete(prompt, 200, 0.8).await?;
        debug!(%reply, "Raw question reply");
        Ok(extract_question(&reply))
    }

    async fn answer_yes_no(&self, secret: &str, question: &str) -> Result<Answer> {
        let prompt = format!(
            "The secret word is '{secret}'.\n\
             Answer the following question with only 'yes' or 'no':\n\
             Question: {question}\n"
        );
        let reply = self.complete(prompt, 20, 0.0).await?;
        debug!(%reply, "Raw answer reply");
        Ok(Answer::parse(&reply))
    }

    async fn pick_secret_word(&self) -> Result<String> {
        let prompt = "Please choose one simple, common English word (preferably 4-8 letters) \
                      that is not too complex, and output only the word."
            .to_string();
        let reply = self.complete(prompt, 10, 0.5).await?;
        let word = reply
            .split_whitespace()
            .next()
            .map(|w| w.trim_matches(|c: char| !c.is_alphabetic()).to_lowercase())
            .filter(|w| !w.is_empty())
            .context("LLM returned no word")?;
        Ok(word)
    }
}

/// Deadline-and-fallback wrapper around a [`GameOracle`].
///
/// Every method always returns a usable value.
#[derive(Clone)]
pub struct BoundedOracle {
    inner: Arc<dyn GameOracle>,
    timeout: Duration,
}

impl BoundedOracle {
    pub fn new(inner: Arc<dyn GameOracle>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub async fn propose_next_question(&self, rounds: &[QuestionRound], last_feedback: &str) -> String {
        self.bounded(
            "propose_next_question",
            self.inner.propose_next_question(rounds, last_feedback),
        )
        .await
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| FALLBACK_QUESTION.to_string())
    }

    pub async fn answer_yes_no(&self, secret: &str, question: &str) -> Answer {
        self.bounded("answer_yes_no", self.inner.answer_yes_no(secret, question))
            .await
            .unwrap_or(Answer::Unknown)
    }

    pub async fn pick_secret_word(&self) -> String {
        self.bounded("pick_secret_word", self.inner.pick_secret_word())
            .await
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .unwrap_or_else(|| FALLBACK_SECRET_WORD.to_string())
    }

    async fn bounded<T>(&self, operation: &str, call: impl Future<Output = Result<T>>) -> Option<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                error!(operation, error = ?e, "LLM call failed; using fallback");
                None
            }
            Err(_) => {
                error!(operation, timeout_secs = self.timeout.as_secs_f64(), "LLM call timed out; using fallback");
                None
            }
        }
    }
}
