//! Client-side collaborators: upload, chat log and presentation
//!
//! The server never touches presentation state. A client uploads audio with
//! [`Uploader`], then hands the returned [`ChatResult`] to a
//! [`ResponsePresenter`], which appends to an append-only [`ChatLog`] and
//! speaks the reply.

mod uploader;

pub use uploader::{Uploader, mime_for_path};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Result;
use crate::pipeline::ChatResult;

/// Greeting shown before the first exchange
pub const GREETING: &str = "Hello! Press Enter to start talking.";

/// One displayed chat entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub text: String,
    pub from_user: bool,
    pub position: usize,
    pub timestamp: DateTime<Utc>,
}

/// Append-only ordered sequence of chat messages
#[derive(Debug, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Log seeded with an assistant greeting
    #[must_use]
    pub fn with_greeting() -> Self {
        let mut log = Self::new();
        log.append(GREETING, false);
        log
    }

    /// Append a message and return it
    pub fn append(&mut self, text: impl Into<String>, from_user: bool) -> &ChatMessage {
        let position = self.messages.len();
        self.messages.push(ChatMessage {
            text: text.into(),
            from_user,
            position,
            timestamp: Utc::now(),
        });
        &self.messages[position]
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Reads reply text aloud
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Speak `text`, returning once playback is done
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Callback invoked for every appended message
pub type DisplaySink = Box<dyn Fn(&ChatMessage) + Send + Sync>;

/// Turns chat results into log entries and speech
pub struct ResponsePresenter {
    log: ChatLog,
    speaker: Option<Box<dyn Speaker>>,
    display: Option<DisplaySink>,
}

impl ResponsePresenter {
    #[must_use]
    pub fn new(log: ChatLog, speaker: Option<Box<dyn Speaker>>) -> Self {
        Self {
            log,
            speaker,
            display: None,
        }
    }

    /// Render each message as it is appended
    #[must_use]
    pub fn with_display(mut self, display: impl Fn(&ChatMessage) + Send + Sync + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    /// Append transcription (user) then response (assistant), then speak the response
    ///
    /// Both messages are appended before speech starts, so a speech failure
    /// leaves the log complete.
    ///
    /// # Errors
    ///
    /// Returns error if speaking the response fails
    pub async fn present(&mut self, result: &ChatResult) -> Result<()> {
        self.push(result.transcription(), true);
        self.push(result.response(), false);

        if let Some(speaker) = &self.speaker {
            speaker.speak(result.response()).await?;
        }
        Ok(())
    }

    #[must_use]
    pub const fn log(&self) -> &ChatLog {
        &self.log
    }

    fn push(&mut self, text: &str, from_user: bool) {
        let message = self.log.append(text, from_user);
        if let Some(display) = &self.display {
            display(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::Error;

    struct RecordingSpeaker {
        spoken: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl Speaker for RecordingSpeaker {
        async fn speak(&self, text: &str) -> Result<()> {
            self.spoken.lock().unwrap().push(text.to_string());
            if self.fail {
                Err(Error::Tts("speaker unplugged".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn result() -> ChatResult {
        ChatResult::new(Some("what's up".to_string()), Some("Not much!".to_string()))
    }

    #[test]
    fn test_log_positions_are_sequential() {
        let mut log = ChatLog::with_greeting();
        log.append("one", true);
        log.append("two", false);

        let positions: Vec<usize> = log.messages().iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(log.messages()[0].text, GREETING);
        assert!(!log.messages()[0].from_user);
    }

    #[tokio::test]
    async fn test_present_appends_in_order_and_speaks_response_only() {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let speaker = RecordingSpeaker {
            spoken: spoken.clone(),
            fail: false,
        };
        let mut presenter = ResponsePresenter::new(ChatLog::new(), Some(Box::new(speaker)));

        presenter.present(&result()).await.unwrap();

        let messages = presenter.log().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "what's up");
        assert!(messages[0].from_user);
        assert_eq!(messages[1].text, "Not much!");
        assert!(!messages[1].from_user);
        assert_eq!(*spoken.lock().unwrap(), vec!["Not much!".to_string()]);
    }

    #[test]
    fn test_speech_failure_keeps_log() {
        let speaker = RecordingSpeaker {
            spoken: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        };
        let mut presenter = ResponsePresenter::new(ChatLog::new(), Some(Box::new(speaker)));

        let outcome = tokio_test::block_on(presenter.present(&result()));

        assert!(matches!(outcome, Err(Error::Tts(_))));
        assert_eq!(presenter.log().len(), 2);
    }

    #[tokio::test]
    async fn test_display_sees_each_append() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut presenter = ResponsePresenter::new(ChatLog::new(), None)
            .with_display(move |m| sink.lock().unwrap().push((m.position, m.from_user)));

        presenter.present(&result()).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(0, true), (1, false)]);
    }

    #[tokio::test]
    async fn test_present_without_speaker() {
        let mut presenter = ResponsePresenter::new(ChatLog::new(), None);
        presenter.present(&result()).await.unwrap();
        assert_eq!(presenter.log().len(), 2);
    }
}
