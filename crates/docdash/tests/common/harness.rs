//! Scripted job backend and clock helpers.
//!
//! `MockJobApi` keeps an ordered job store like the real backend (newest
//! first). Poll answers for a job can be scripted as a sequence; once a
//! script runs out the last scripted status keeps being returned.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use docdash::{
    ApiError, ChatMessage, ChatReply, Job, JobApi, JobId, JobStatus, Notification, UploadFile,
};

use super::builders::job;

/// One scripted answer to `get_job`.
#[derive(Debug, Clone)]
pub enum PollStep {
    Status(JobStatus),
    Fail,
}

#[derive(Debug, Clone)]
pub struct ChatCall {
    pub job_id: JobId,
    pub prompt: String,
    pub history: Vec<ChatMessage>,
}

#[derive(Default)]
struct MockState {
    next_id: JobId,
    store: Vec<Job>,
    ids_by_file: HashMap<String, JobId>,
    failing_creates: HashSet<String>,
    failing_deletes: HashSet<JobId>,
    fail_list: bool,
    list_delays: VecDeque<Duration>,
    polls: HashMap<JobId, VecDeque<PollStep>>,
    chat_replies: VecDeque<Result<String, ApiError>>,

    create_calls: Vec<String>,
    get_jobs_calls: usize,
    get_job_calls: HashMap<JobId, usize>,
    delete_calls: Vec<JobId>,
    chat_calls: Vec<ChatCall>,
}

/// In-memory `JobApi` with scripted answers and per-endpoint call counters.
#[derive(Clone, Default)]
pub struct MockJobApi {
    state: Arc<Mutex<MockState>>,
}

fn server_error() -> ApiError {
    ApiError::Status {
        status: 500,
        body: "Internal Server Error".to_string(),
    }
}

fn not_found() -> ApiError {
    ApiError::Status {
        status: 404,
        body: "Not found.".to_string(),
    }
}

impl MockJobApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.lock().next_id = 1;
        api
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn as_api(&self) -> Arc<dyn JobApi> {
        Arc::new(self.clone())
    }

    // Scripting

    /// Assigns `id` to the job created for `file_name`.
    pub fn job_for_file(self, file_name: &str, id: JobId) -> Self {
        self.lock().ids_by_file.insert(file_name.to_string(), id);
        self
    }

    pub fn fail_create(self, file_name: &str) -> Self {
        self.lock().failing_creates.insert(file_name.to_string());
        self
    }

    pub fn fail_delete(self, id: JobId) -> Self {
        self.lock().failing_deletes.insert(id);
        self
    }

    pub fn polls(self, id: JobId, steps: Vec<PollStep>) -> Self {
        self.lock().polls.insert(id, steps.into());
        self
    }

    pub fn statuses(self, id: JobId, statuses: &[JobStatus]) -> Self {
        let steps = statuses.iter().copied().map(PollStep::Status).collect();
        self.polls(id, steps)
    }

    pub fn with_job(self, job: Job) -> Self {
        self.insert_job(job);
        self
    }

    /// Adds a job to the front of the store, as a newly created job would be.
    pub fn insert_job(&self, job: Job) {
        self.lock().store.insert(0, job);
    }

    /// Removes a job behind the client's back.
    pub fn remove_job(&self, id: JobId) {
        self.lock().store.retain(|j| j.id != id);
    }

    /// The next `get_jobs` answers with the store as it was when the call
    /// started, after `ms` of latency.
    pub fn slow_list_once(&self, ms: u64) {
        self.lock().list_delays.push_back(Duration::from_millis(ms));
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.lock().fail_list = fail;
    }

    pub fn reply_with(self, reply: &str) -> Self {
        self.lock().chat_replies.push_back(Ok(reply.to_string()));
        self
    }

    pub fn fail_chat(self) -> Self {
        self.lock().chat_replies.push_back(Err(server_error()));
        self
    }

    // Inspection

    pub fn create_calls(&self) -> Vec<String> {
        self.lock().create_calls.clone()
    }

    pub fn get_jobs_calls(&self) -> usize {
        self.lock().get_jobs_calls
    }

    pub fn get_job_calls(&self, id: JobId) -> usize {
        self.lock().get_job_calls.get(&id).copied().unwrap_or(0)
    }

    pub fn total_get_job_calls(&self) -> usize {
        self.lock().get_job_calls.values().sum()
    }

    pub fn delete_calls(&self) -> Vec<JobId> {
        self.lock().delete_calls.clone()
    }

    pub fn chat_calls(&self) -> Vec<ChatCall> {
        self.lock().chat_calls.clone()
    }

    pub fn stored_ids(&self) -> Vec<JobId> {
        self.lock().store.iter().map(|j| j.id).collect()
    }
}

#[async_trait]
impl JobApi for MockJobApi {
    async fn create_job(&self, file: &UploadFile) -> Result<Job, ApiError> {
        let mut state = self.lock();
        state.create_calls.push(file.name.clone());
        if state.failing_creates.contains(&file.name) {
            return Err(server_error());
        }

        let id = match state.ids_by_file.get(&file.name) {
            Some(id) => *id,
            None => {
                let id = state.next_id;
                state.next_id += 1;
                id
            }
        };
        let created = job(id, JobStatus::Pending);
        state.store.insert(0, created.clone());
        Ok(created)
    }

    async fn get_jobs(&self) -> Result<Vec<Job>, ApiError> {
        let (jobs, delay) = {
            let mut state = self.lock();
            state.get_jobs_calls += 1;
            if state.fail_list {
                return Err(server_error());
            }
            (state.store.clone(), state.list_delays.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(jobs)
    }

    async fn get_job(&self, id: JobId) -> Result<Job, ApiError> {
        let mut state = self.lock();
        *state.get_job_calls.entry(id).or_insert(0) += 1;

        let step = match state.polls.get_mut(&id) {
            Some(steps) if steps.len() > 1 => steps.pop_front(),
            Some(steps) => steps.front().cloned(),
            None => None,
        };

        let stored = state.store.iter_mut().find(|j| j.id == id);
        match (step, stored) {
            (Some(PollStep::Fail), _) => Err(server_error()),
            (_, None) => Err(not_found()),
            (Some(PollStep::Status(status)), Some(job)) => {
                job.status = status;
                Ok(job.clone())
            }
            (None, Some(job)) => Ok(job.clone()),
        }
    }

    async fn delete_job(&self, id: JobId) -> Result<(), ApiError> {
        let mut state = self.lock();
        state.delete_calls.push(id);
        if state.failing_deletes.contains(&id) {
            return Err(server_error());
        }
        let before = state.store.len();
        state.store.retain(|j| j.id != id);
        if state.store.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn post_chat_message(
        &self,
        job_id: JobId,
        prompt: &str,
        history: &[ChatMessage],
    ) -> Result<ChatReply, ApiError> {
        let mut state = self.lock();
        state.chat_calls.push(ChatCall {
            job_id,
            prompt: prompt.to_string(),
            history: history.to_vec(),
        });
        let reply = state
            .chat_replies
            .pop_front()
            .unwrap_or_else(|| Ok(format!("Answer to: {}", prompt)))?;
        Ok(ChatReply { reply })
    }
}

// Clock and channel helpers

/// Advances the paused clock, letting every task that becomes ready run.
pub async fn advance_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Lets spawned tasks run without moving the clock meaningfully.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn drain_notifications(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

pub fn count_titled(notifications: &[Notification], title: &str) -> usize {
    notifications.iter().filter(|n| n.title == title).count()
}

pub fn drain_signals(rx: &mut broadcast::Receiver<()>) -> usize {
    let mut count = 0;
    while rx.try_recv().is_ok() {
        count += 1;
    }
    count
}
