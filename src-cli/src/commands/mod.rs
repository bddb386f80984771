//! CLI commands.
//!
//! Commands are organized by domain:
//! - `upload`: Uploading files and following them to completion
//! - `jobs`: Listing, watching, showing and deleting jobs
//! - `chat`: Interactive questions about a processed document

pub mod chat;
pub mod jobs;
pub mod upload;

pub use chat::run_chat;
pub use jobs::{delete_job, list_jobs, show_job, watch_jobs};
pub use upload::run_upload;

use docdash::{ApiError, ChatError, DocdashError, Notification, NotificationLevel};
use thiserror::Error;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Docdash(#[from] DocdashError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Unfinished(String),
}

/// Prints notifications to stderr while a command runs.
pub struct NotificationPrinter {
    done: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl NotificationPrinter {
    pub fn spawn(mut rx: broadcast::Receiver<Notification>) -> Self {
        let (done, mut finish) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(notification) => eprintln!("{}", format_notification(&notification)),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            log::debug!("Skipped {} notifications", skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = &mut finish => {
                        while let Ok(notification) = rx.try_recv() {
                            eprintln!("{}", format_notification(&notification));
                        }
                        break;
                    }
                }
            }
        });
        Self { done, handle }
    }

    /// Prints whatever is still queued, then stops.
    pub async fn finish(self) {
        let _ = self.done.send(());
        if let Err(e) = self.handle.await {
            log::debug!("Notification printer ended abnormally: {}", e);
        }
    }
}

pub fn format_notification(notification: &Notification) -> String {
    let marker = match notification.level {
        NotificationLevel::Info => "i",
        NotificationLevel::Success => "+",
        NotificationLevel::Warning => "!",
        NotificationLevel::Error => "x",
    };
    match &notification.description {
        Some(description) => format!("[{}] {}: {}", marker, notification.title, description),
        None => format!("[{}] {}", marker, notification.title),
    }
}
