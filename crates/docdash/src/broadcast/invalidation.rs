//! Invalidate signal for the persisted job list.

use tokio::sync::broadcast;

/// One-way "refetch the job list" signal.
///
/// Producers never touch the list itself; the job list view-model subscribes
/// and refreshes on every signal.
#[derive(Clone)]
pub struct JobListInvalidator {
    sender: broadcast::Sender<()>,
}

impl JobListInvalidator {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn invalidate(&self) {
        log::debug!("Job list invalidated");
        let _ = self.sender.send(());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }
}

impl Default for JobListInvalidator {
    fn default() -> Self {
        Self::new(16)
    }
}
