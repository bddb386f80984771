//! Persisted job list: one row per server job, each row polling its own
//! status until terminal.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::api::{Job, JobApi, JobId, JobStatus};
use crate::broadcast::NotificationBroadcaster;
use crate::config::PollConfig;
use crate::error::ApiError;
use crate::poll::{FailureStreak, PollTask, PollTicker, StopSignal};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRow {
    pub job: Job,
    /// Whether a status poll is still scheduled for this row.
    pub polling: bool,
    pub poll_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl JobRow {
    pub fn id(&self) -> JobId {
        self.job.id
    }

    pub fn status(&self) -> JobStatus {
        self.job.status
    }

    pub fn display_name(&self) -> String {
        self.job.display_name()
    }

    pub fn progress_percent(&self) -> u8 {
        self.job.status.progress_percent()
    }

    /// Link to the detail view; only finished jobs have one.
    pub fn detail_link(&self) -> Option<String> {
        (self.job.status == JobStatus::Success).then(|| format!("/jobs/{}", self.job.id))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct JobListSnapshot {
    pub rows: Vec<JobRow>,
    /// False until the first successful fetch.
    pub loaded: bool,
}

struct RowState {
    job: Job,
    last_status: JobStatus,
    streak: u32,
    last_error: Option<String>,
    poll: Option<PollTask>,
}

impl RowState {
    fn to_row(&self) -> JobRow {
        JobRow {
            job: self.job.clone(),
            polling: self.poll.as_ref().is_some_and(|p| !p.is_stopped()),
            poll_failures: self.streak,
            last_error: self.last_error.clone(),
        }
    }

    fn stop_polling(&mut self) {
        if let Some(mut poll) = self.poll.take() {
            poll.stop();
        }
    }

    /// Takes a freshly fetched job. Returns true on the first observed move
    /// into SUCCESS.
    fn observe(&mut self, job: Job) -> bool {
        let completed = job.status == JobStatus::Success && self.last_status != JobStatus::Success;
        self.last_status = job.status;
        self.streak = 0;
        self.last_error = None;
        if job.is_terminal() {
            self.stop_polling();
        }
        self.job = job;
        completed
    }
}

#[derive(Default)]
struct ListState {
    rows: Vec<RowState>,
    loaded: bool,
    /// Jobs deleted or found missing; a fetch that started earlier may
    /// still list them.
    removed: HashSet<JobId>,
}

impl ListState {
    fn position(&self, id: JobId) -> Option<usize> {
        self.rows.iter().position(|r| r.job.id == id)
    }

    /// Drops the row for good. Returns whether it was present.
    fn remove(&mut self, id: JobId) -> bool {
        self.removed.insert(id);
        match self.position(id) {
            Some(index) => {
                let mut row = self.rows.remove(index);
                row.stop_polling();
                true
            }
            None => false,
        }
    }
}

#[derive(Clone)]
struct Shared {
    api: Arc<dyn JobApi>,
    state: Arc<RwLock<ListState>>,
    snapshot: Arc<watch::Sender<JobListSnapshot>>,
    notifications: NotificationBroadcaster,
    interval: Duration,
    warn_threshold: u32,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, ListState> {
        match self.state.read() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Job list lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, ListState> {
        match self.state.write() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Job list lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn publish(&self, state: &ListState) {
        self.snapshot.send_replace(JobListSnapshot {
            rows: state.rows.iter().map(RowState::to_row).collect(),
            loaded: state.loaded,
        });
    }

    fn notify_completed(&self, completed: Vec<(JobId, String)>) {
        for (id, name) in completed {
            info!("Job {} completed", id);
            self.notifications.success(
                "Processing Complete",
                Some(format!("{} has been processed.", name)),
                Some(id),
            );
        }
    }

    fn new_row(&self, job: Job) -> RowState {
        let poll = (!job.is_terminal()).then(|| {
            let shared = self.clone();
            let id = job.id;
            PollTask::spawn(format!("job:{}", id), move |stop| {
                poll_row(shared, id, stop)
            })
        });

        RowState {
            last_status: job.status,
            job,
            streak: 0,
            last_error: None,
            poll,
        }
    }

    async fn refresh(&self) -> Result<(), ApiError> {
        let jobs = self.api.get_jobs().await.map_err(|e| {
            warn!("Failed to fetch job list: {}", e);
            e
        })?;
        self.reconcile(jobs);
        Ok(())
    }

    /// Rebuilds the rows in server order. Known rows keep their poll and
    /// last observed status; rows the server no longer lists are dropped.
    fn reconcile(&self, jobs: Vec<Job>) {
        let mut completed = Vec::new();
        {
            let mut state = self.write();
            let mut previous: HashMap<JobId, RowState> =
                state.rows.drain(..).map(|r| (r.job.id, r)).collect();

            let mut rows = Vec::with_capacity(jobs.len());
            for job in jobs {
                if state.removed.contains(&job.id) {
                    debug!("Ignoring stale listing of removed job {}", job.id);
                    continue;
                }
                match previous.remove(&job.id) {
                    Some(mut row) => {
                        if row.observe(job) {
                            completed.push((row.job.id, row.job.display_name()));
                        }
                        rows.push(row);
                    }
                    None => rows.push(self.new_row(job)),
                }
            }

            for (id, mut row) in previous {
                debug!("Job {} no longer listed, dropping row", id);
                row.stop_polling();
            }

            debug!("Job list holds {} rows", rows.len());
            state.rows = rows;
            state.loaded = true;
            self.publish(&state);
        }
        self.notify_completed(completed);
    }

    fn apply_poll(&self, id: JobId, job: Job) {
        let mut completed = Vec::new();
        {
            let mut state = self.write();
            let Some(index) = state.position(id) else {
                debug!("Dropping poll result for removed job {}", id);
                return;
            };
            let row = &mut state.rows[index];
            if row.observe(job) {
                completed.push((id, row.job.display_name()));
            }
            self.publish(&state);
        }
        self.notify_completed(completed);
    }

    fn apply_poll_failure(&self, id: JobId, error: &ApiError, failures: u32) {
        let name = {
            let mut state = self.write();
            let Some(index) = state.position(id) else {
                return;
            };
            let row = &mut state.rows[index];
            row.streak = failures;
            row.last_error = Some(error.to_string());
            let name = row.job.display_name();
            self.publish(&state);
            name
        };

        if failures == self.warn_threshold {
            self.notifications.warning(
                "Connection Problem",
                Some(format!(
                    "Status checks for {} failed {} times in a row. Still trying.",
                    name, failures
                )),
                Some(id),
            );
        }
    }

    fn drop_missing(&self, id: JobId) {
        let mut state = self.write();
        if state.remove(id) {
            info!("Job {} no longer exists, dropping row", id);
            self.publish(&state);
        }
    }

    fn stop_all(&self) {
        let mut state = self.write();
        for row in state.rows.iter_mut() {
            row.stop_polling();
        }
    }
}

async fn poll_row(shared: Shared, id: JobId, stop: StopSignal) {
    let mut ticker = PollTicker::new(shared.interval, stop.clone());
    let mut streak = FailureStreak::default();

    while ticker.tick().await {
        let result = shared.api.get_job(id).await;
        if stop.is_stopped() {
            break;
        }

        match result {
            Ok(job) => {
                streak.reset();
                let terminal = job.is_terminal();
                shared.apply_poll(id, job);
                if terminal {
                    break;
                }
            }
            Err(e) if e.is_not_found() => {
                shared.drop_missing(id);
                break;
            }
            Err(e) => {
                let failures = streak.record();
                warn!("Polling job {} failed ({} in a row): {}", id, failures, e);
                shared.apply_poll_failure(id, &e, failures);
            }
        }
    }
}

/// The persisted job list. Dropping it stops every row's poll.
///
/// Must be created inside a tokio runtime.
pub struct JobListViewModel {
    shared: Shared,
    listener: Option<JoinHandle<()>>,
}

impl JobListViewModel {
    pub fn new(
        api: Arc<dyn JobApi>,
        poll: &PollConfig,
        notifications: NotificationBroadcaster,
    ) -> Self {
        let (snapshot, _) = watch::channel(JobListSnapshot::default());
        Self {
            shared: Shared {
                api,
                state: Arc::new(RwLock::new(ListState::default())),
                snapshot: Arc::new(snapshot),
                notifications,
                interval: poll.job_interval(),
                warn_threshold: poll.failure_warn_threshold,
            },
            listener: None,
        }
    }

    /// Initial fetch.
    pub async fn activate(&self) -> Result<(), ApiError> {
        info!("Loading job list");
        self.shared.refresh().await
    }

    /// Refetches the list and reconciles it with the current rows. On error
    /// the rows are left as they were.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.shared.refresh().await
    }

    /// Deletes a job. On success the row's poll is stopped, the row removed
    /// and the list refetched; on failure the row stays. A deleted job never
    /// comes back, even from a fetch that was already in flight.
    pub async fn delete_row(&self, id: JobId) -> Result<(), ApiError> {
        if let Err(e) = self.shared.api.delete_job(id).await {
            warn!("Failed to delete job {}: {}", id, e);
            self.shared.notifications.error(
                "Error",
                Some("Could not remove document.".to_string()),
                Some(id),
            );
            return Err(e);
        }

        {
            let mut state = self.shared.write();
            state.remove(id);
            self.shared.publish(&state);
        }
        info!("Deleted job {}", id);
        self.shared.notifications.success(
            "Document Removed",
            Some("The document has been deleted.".to_string()),
            Some(id),
        );

        if let Err(e) = self.shared.refresh().await {
            warn!("Refetch after deleting job {} failed: {}", id, e);
        }
        Ok(())
    }

    /// Refreshes on every signal from `rx` until the sender side closes.
    /// Signals that pile up during a refresh are coalesced into one refetch.
    pub fn listen_for_invalidations(&mut self, mut rx: broadcast::Receiver<()>) {
        if let Some(previous) = self.listener.take() {
            previous.abort();
        }

        let shared = self.shared.clone();
        let span = tracing::info_span!("job_list_invalidation");
        let listener = async move {
            loop {
                match rx.recv().await {
                    Ok(()) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Coalesced {} invalidations", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                while rx.try_recv().is_ok() {}

                if let Err(e) = shared.refresh().await {
                    warn!("Job list refresh failed: {}", e);
                }
            }
            debug!("Invalidation listener stopped");
        };
        self.listener = Some(tokio::spawn(listener.instrument(span)));
    }

    pub fn rows(&self) -> Vec<JobRow> {
        self.shared.read().rows.iter().map(RowState::to_row).collect()
    }

    pub fn row(&self, id: JobId) -> Option<JobRow> {
        let state = self.shared.read();
        state.position(id).map(|i| state.rows[i].to_row())
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.read().loaded
    }

    pub fn snapshot(&self) -> JobListSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JobListSnapshot> {
        self.shared.snapshot.subscribe()
    }
}

impl Drop for JobListViewModel {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.shared.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job(id: JobId, status: JobStatus) -> Job {
        Job {
            id,
            status,
            result: None,
            document: Some(format!("documents/file-{}.pdf", id)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn row_state(status: JobStatus) -> RowState {
        RowState {
            job: job(1, status),
            last_status: status,
            streak: 0,
            last_error: None,
            poll: None,
        }
    }

    #[test]
    fn test_detail_link_only_for_success() {
        let mut row = row_state(JobStatus::Processing).to_row();
        assert_eq!(row.detail_link(), None);
        assert_eq!(row.progress_percent(), 65);

        row.job.status = JobStatus::Success;
        assert_eq!(row.detail_link().as_deref(), Some("/jobs/1"));

        row.job.status = JobStatus::Failed;
        assert_eq!(row.detail_link(), None);
        assert_eq!(row.progress_percent(), 100);
    }

    #[test]
    fn test_observe_reports_success_once() {
        let mut row = row_state(JobStatus::Pending);
        assert!(!row.observe(job(1, JobStatus::Processing)));
        assert!(row.observe(job(1, JobStatus::Success)));
        assert!(!row.observe(job(1, JobStatus::Success)));
    }

    #[test]
    fn test_observe_already_successful_row_is_silent() {
        let mut row = row_state(JobStatus::Success);
        assert!(!row.observe(job(1, JobStatus::Success)));
    }

    #[test]
    fn test_observe_clears_failures() {
        let mut row = row_state(JobStatus::Pending);
        row.streak = 2;
        row.last_error = Some("timeout".into());
        row.observe(job(1, JobStatus::Processing));
        assert_eq!(row.streak, 0);
        assert!(row.last_error.is_none());
        assert_eq!(row.to_row().display_name(), "file-1.pdf");
    }
}
