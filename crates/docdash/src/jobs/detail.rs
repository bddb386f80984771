use crate::api::{Job, JobApi, JobId, JobStatus};
use crate::error::ApiError;

const NO_SUMMARY: &str = "No summary available.";

/// A single job as shown on its detail page.
#[derive(Debug, Clone)]
pub struct JobDetail {
    job: Job,
}

impl JobDetail {
    pub async fn load(api: &dyn JobApi, id: JobId) -> Result<Self, ApiError> {
        let job = api.get_job(id).await?;
        Ok(Self { job })
    }

    pub fn from_job(job: Job) -> Self {
        Self { job }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn id(&self) -> JobId {
        self.job.id
    }

    pub fn status(&self) -> JobStatus {
        self.job.status
    }

    pub fn display_name(&self) -> String {
        self.job.display_name()
    }

    pub fn summary(&self) -> &str {
        match self.job.result.as_deref() {
            Some(result) if !result.trim().is_empty() => result,
            _ => NO_SUMMARY,
        }
    }

    /// The backend only answers questions about processed documents.
    pub fn chat_available(&self) -> bool {
        self.job.status == JobStatus::Success
    }
}
