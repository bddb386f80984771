//! Job service client: the typed accessor for the dashboard's REST contract.
//!
//! Everything that talks to the backend goes through [`JobApi`], so the
//! upload and job-list state machines can be driven by a scripted
//! implementation in tests.

pub mod client;
pub mod file;
pub mod models;

use async_trait::async_trait;

use crate::error::ApiError;

pub use client::HttpJobClient;
pub use file::{format_size, UploadFile};
pub use models::{ChatMessage, ChatReply, ChatRequest, ChatRole, Job, JobId, JobStatus};

/// Job CRUD and chat operations. Calls are never retried here.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// `POST /jobs/` with the file as multipart field `document`.
    async fn create_job(&self, file: &UploadFile) -> Result<Job, ApiError>;

    /// `GET /jobs/`, in server-defined order.
    async fn get_jobs(&self) -> Result<Vec<Job>, ApiError>;

    /// `GET /jobs/{id}/`.
    async fn get_job(&self, id: JobId) -> Result<Job, ApiError>;

    /// `DELETE /jobs/{id}/`.
    async fn delete_job(&self, id: JobId) -> Result<(), ApiError>;

    /// `POST /jobs/{id}/chat/`.
    async fn post_chat_message(
        &self,
        job_id: JobId,
        prompt: &str,
        history: &[ChatMessage],
    ) -> Result<ChatReply, ApiError>;
}
