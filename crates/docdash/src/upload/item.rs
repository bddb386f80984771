//! One uploaded file: its client-side state and the task that drives it from
//! job creation to a terminal status.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::{format_size, Job, JobApi, JobStatus, UploadFile};
use crate::poll::{FailureStreak, PollTask, PollTicker, StopSignal};

/// Client-side key of an upload item, unique even for repeated file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LocalId(String);

impl LocalId {
    pub fn generate(file_name: &str) -> Self {
        Self(format!(
            "{}-{}-{}",
            file_name,
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    Queued,
    Creating,
    Polling,
    Succeeded,
    Failed,
}

impl UploadPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadPhase::Succeeded | UploadPhase::Failed)
    }

    fn from_job(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending | JobStatus::Processing => UploadPhase::Polling,
            JobStatus::Success => UploadPhase::Succeeded,
            JobStatus::Failed => UploadPhase::Failed,
        }
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadPhase::Queued => write!(f, "queued"),
            UploadPhase::Creating => write!(f, "creating"),
            UploadPhase::Polling => write!(f, "polling"),
            UploadPhase::Succeeded => write!(f, "succeeded"),
            UploadPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Snapshot of one upload item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadItem {
    pub local_id: LocalId,
    pub file_name: String,
    pub size: u64,
    pub phase: UploadPhase,
    /// Set once, when job creation succeeds; refreshed by every poll.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
    /// Create failure, or the most recent poll failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub poll_failures: u32,
}

impl UploadItem {
    pub(crate) fn queued(local_id: LocalId, file: &UploadFile) -> Self {
        Self {
            local_id,
            file_name: file.name.clone(),
            size: file.size(),
            phase: UploadPhase::Queued,
            job: None,
            last_error: None,
            poll_failures: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.job.as_ref().map(|job| job.status)
    }

    pub fn progress_percent(&self) -> u8 {
        match (&self.job, self.phase) {
            (_, phase) if phase.is_terminal() => 100,
            (Some(job), _) => job.status.progress_percent(),
            (None, UploadPhase::Queued) => 0,
            (None, UploadPhase::Creating) => 10,
            (None, _) => 100,
        }
    }

    pub fn display_size(&self) -> String {
        format_size(self.size)
    }

    /// Applies a report from this item's task. Returns what the owner has to
    /// act on. Reports that would move a terminal item are ignored.
    pub(crate) fn apply(&mut self, event: UploadEvent) -> Transition {
        if self.is_terminal() {
            return Transition::None;
        }

        match event {
            UploadEvent::Creating => {
                self.phase = UploadPhase::Creating;
                Transition::None
            }
            UploadEvent::Created(job) => {
                let first = self.job.is_none();
                self.phase = UploadPhase::from_job(job.status);
                self.job = Some(job);
                if first {
                    Transition::Created
                } else {
                    Transition::None
                }
            }
            UploadEvent::CreateFailed(error) => {
                self.phase = UploadPhase::Failed;
                self.last_error = Some(error);
                Transition::CreateFailed
            }
            UploadEvent::Polled(job) => {
                self.phase = UploadPhase::from_job(job.status);
                self.job = Some(job);
                self.poll_failures = 0;
                Transition::None
            }
            UploadEvent::PollFailed { error, failures } => {
                self.last_error = Some(error);
                self.poll_failures = failures;
                Transition::PollFailed(failures)
            }
            UploadEvent::JobGone(error) => {
                self.phase = UploadPhase::Failed;
                self.last_error = Some(error);
                Transition::JobGone
            }
        }
    }
}

/// Status report sent by an item's task to its owner.
#[derive(Debug, Clone)]
pub(crate) enum UploadEvent {
    Creating,
    Created(Job),
    CreateFailed(String),
    Polled(Job),
    PollFailed { error: String, failures: u32 },
    /// The server answered 404 for the job; it was deleted elsewhere.
    JobGone(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transition {
    None,
    Created,
    CreateFailed,
    PollFailed(u32),
    JobGone,
}

#[derive(Debug, Clone)]
pub(crate) struct UploadReport {
    pub local_id: LocalId,
    pub event: UploadEvent,
}

/// Drives one upload: a single `create_job`, then polling until terminal.
pub struct UploadItemController {
    local_id: LocalId,
    file: Arc<UploadFile>,
    api: Arc<dyn JobApi>,
    interval: Duration,
    reports: mpsc::UnboundedSender<UploadReport>,
    task: Option<PollTask>,
}

impl UploadItemController {
    pub(crate) fn new(
        local_id: LocalId,
        file: UploadFile,
        api: Arc<dyn JobApi>,
        interval: Duration,
        reports: mpsc::UnboundedSender<UploadReport>,
    ) -> Self {
        Self {
            local_id,
            file: Arc::new(file),
            api,
            interval,
            reports,
            task: None,
        }
    }

    pub fn local_id(&self) -> &LocalId {
        &self.local_id
    }

    /// Starts the upload. Only the first call submits the file; returns
    /// whether this call did.
    pub fn activate(&mut self) -> bool {
        if self.task.is_some() {
            debug!("Upload {} already active", self.local_id);
            return false;
        }

        let local_id = self.local_id.clone();
        let file = Arc::clone(&self.file);
        let api = Arc::clone(&self.api);
        let interval = self.interval;
        let reports = self.reports.clone();

        self.task = Some(PollTask::spawn(
            format!("upload:{}", self.local_id),
            move |stop| run_upload(local_id, file, api, interval, reports, stop),
        ));
        true
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_stopped())
    }

    /// Cancels the task. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.as_mut() {
            task.stop();
        }
    }
}

async fn run_upload(
    local_id: LocalId,
    file: Arc<UploadFile>,
    api: Arc<dyn JobApi>,
    interval: Duration,
    reports: mpsc::UnboundedSender<UploadReport>,
    stop: StopSignal,
) {
    let report = |event: UploadEvent| {
        let _ = reports.send(UploadReport {
            local_id: local_id.clone(),
            event,
        });
    };

    report(UploadEvent::Creating);
    let job = match api.create_job(&file).await {
        Ok(job) => job,
        Err(e) => {
            warn!("Failed to create job for {}: {}", file.name, e);
            if !stop.is_stopped() {
                report(UploadEvent::CreateFailed(e.to_string()));
            }
            return;
        }
    };

    if stop.is_stopped() {
        return;
    }
    info!("Created job {} for {}", job.id, file.name);
    let job_id = job.id;
    let terminal = job.is_terminal();
    report(UploadEvent::Created(job));
    if terminal {
        return;
    }

    let mut ticker = PollTicker::new(interval, stop.clone());
    let mut streak = FailureStreak::default();
    while ticker.tick().await {
        let result = api.get_job(job_id).await;
        if stop.is_stopped() {
            break;
        }

        match result {
            Ok(job) => {
                streak.reset();
                let terminal = job.is_terminal();
                if terminal {
                    info!("Job {} finished with {}", job_id, job.status);
                }
                report(UploadEvent::Polled(job));
                if terminal {
                    break;
                }
            }
            Err(e) if e.is_not_found() => {
                warn!("Job {} for {} no longer exists", job_id, file.name);
                report(UploadEvent::JobGone(e.to_string()));
                break;
            }
            Err(e) => {
                let failures = streak.record();
                warn!(
                    "Polling job {} failed ({} in a row): {}",
                    job_id, failures, e
                );
                report(UploadEvent::PollFailed {
                    error: e.to_string(),
                    failures,
                });
            }
        }
    }
}
