use std::sync::Arc;

use log::{debug, warn};

use crate::api::{ChatMessage, JobApi, JobId};
use crate::broadcast::NotificationBroadcaster;
use crate::error::ChatError;

/// Conversation about one processed document.
///
/// `send_message` borrows the session mutably, so one session never has two
/// turns in flight.
pub struct ChatSession {
    api: Arc<dyn JobApi>,
    job_id: JobId,
    transcript: Vec<ChatMessage>,
    history_window: usize,
    notifications: NotificationBroadcaster,
}

impl ChatSession {
    pub fn new(
        api: Arc<dyn JobApi>,
        job_id: JobId,
        history_window: usize,
        notifications: NotificationBroadcaster,
    ) -> Self {
        Self {
            api,
            job_id,
            transcript: Vec::new(),
            history_window,
            notifications,
        }
    }

    /// Resumes from an earlier transcript.
    pub fn with_transcript(mut self, transcript: Vec<ChatMessage>) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Context sent with the next turn: the most recent entries, not
    /// including the prompt being sent.
    pub fn history(&self) -> &[ChatMessage] {
        let start = self.transcript.len().saturating_sub(self.history_window);
        &self.transcript[start..]
    }

    /// Sends one turn. The user entry is appended before the request and
    /// kept on failure; the reply is appended only on success.
    pub async fn send_message(&mut self, prompt: &str) -> Result<&ChatMessage, ChatError> {
        if prompt.trim().is_empty() {
            return Err(ChatError::EmptyPrompt);
        }

        let history = self.history().to_vec();
        self.transcript.push(ChatMessage::user(prompt));
        debug!(
            "Sending chat turn for job {} with {} history entries",
            self.job_id,
            history.len()
        );

        match self
            .api
            .post_chat_message(self.job_id, prompt, &history)
            .await
        {
            Ok(reply) => {
                self.transcript.push(ChatMessage::assistant(reply.reply));
                Ok(&self.transcript[self.transcript.len() - 1])
            }
            Err(e) => {
                warn!("Chat request for job {} failed: {}", self.job_id, e);
                self.notifications.error(
                    "Error",
                    Some("Could not get a response. Please try again.".to_string()),
                    Some(self.job_id),
                );
                Err(ChatError::Api(e))
            }
        }
    }
}
