//! User-visible notifications (toasts) for upload, job and chat events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::api::JobId;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationLevel::Info => write!(f, "info"),
            NotificationLevel::Success => write!(f, "success"),
            NotificationLevel::Warning => write!(f, "warning"),
            NotificationLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Job this notification refers to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: &str) -> Self {
        Self {
            level,
            title: title.to_string(),
            description: None,
            job_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn for_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }
}

/// Fans notifications out to every subscriber.
#[derive(Clone)]
pub struct NotificationBroadcaster {
    sender: Arc<broadcast::Sender<Notification>>,
}

impl NotificationBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, notification: Notification) {
        log::debug!(
            "Notification [{}] {}",
            notification.level,
            notification.title
        );
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    pub fn success(&self, title: &str, description: Option<String>, job_id: Option<JobId>) {
        self.send(build(NotificationLevel::Success, title, description, job_id));
    }

    pub fn warning(&self, title: &str, description: Option<String>, job_id: Option<JobId>) {
        self.send(build(NotificationLevel::Warning, title, description, job_id));
    }

    pub fn error(&self, title: &str, description: Option<String>, job_id: Option<JobId>) {
        self.send(build(NotificationLevel::Error, title, description, job_id));
    }
}

fn build(
    level: NotificationLevel,
    title: &str,
    description: Option<String>,
    job_id: Option<JobId>,
) -> Notification {
    let mut notification = Notification::new(level, title);
    notification.description = description;
    notification.job_id = job_id;
    notification
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
