//! Speech-to-text word buffer.
//!
//! Transcripts arrive as events on a WAMP topic; their words are appended to a
//! shared buffer that the game drains when it waits for an answer.

use crate::wamp::WampEvent;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Source of recognized user words.
pub trait TranscriptSource: Send + Sync {
    /// Discards everything heard so far.
    fn clear(&self);

    /// Removes and returns the words heard since the last call, if any.
    fn take_words(&self) -> Option<Vec<String>>;
}

/// Shared buffer of recognized words.
#[derive(Clone, Default)]
pub struct WordBuffer {
    words: Arc<Mutex<Vec<String>>>,
}

impl WordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the whitespace-separated words of `transcript`.
    pub fn push_transcript(&self, transcript: &str) {
        let mut words = self.words.lock().unwrap_or_else(PoisonError::into_inner);
        words.extend(transcript.split_whitespace().map(str::to_string));
    }

    /// Feeds every transcript in `events` into the buffer until the
    /// subscription closes.
    pub fn listen(&self, mut events: mpsc::Receiver<WampEvent>) -> JoinHandle<()> {
        let buffer = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let Some(text) = transcript_of(&event) {
                    debug!(%text, "Heard");
                    buffer.push_transcript(&text);
                }
            }
            debug!("Transcript subscription closed");
        })
    }
}

impl TranscriptSource for WordBuffer {
    fn clear(&self) {
        self.words
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn take_words(&self) -> Option<Vec<String>> {
        let mut words = self.words.lock().unwrap_or_else(PoisonError::into_inner);
        if words.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut *words))
        }
    }
}

/// Extracts the final transcript text from an STT event.
///
/// Accepts a bare string argument, or an object carrying `text` somewhere in
/// its (possibly nested) `data`/`body` envelopes. Results explicitly marked
/// `"final": false` are interim and skipped.
pub fn transcript_of(event: &WampEvent) -> Option<String> {
    if let Some(text) = event.kwargs.get("text").and_then(Value::as_str) {
        if event.kwargs.get("final").and_then(Value::as_bool) != Some(false) {
            return non_empty(text);
        }
        return None;
    }
    event.args.iter().find_map(text_in)
}

fn text_in(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => non_empty(text),
        Value::Object(map) => {
            if map.get("final").and_then(Value::as_bool) == Some(false) {
                return None;
            }
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                return non_empty(text);
            }
            ["data", "body"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(text_in)
        }
        _ => None,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
