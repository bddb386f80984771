//! `reqwest` implementation of [`JobApi`].

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use super::models::{ChatMessage, ChatReply, ChatRequest, Job, JobId};
use super::{JobApi, UploadFile};
use crate::error::ApiError;

/// Maximum length for error bodies carried in [`ApiError::Status`].
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Default connect timeout for HTTP requests (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout for HTTP requests (30 seconds).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn truncate_error_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let cut: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", cut)
    } else {
        body.to_string()
    }
}

fn create_http_client() -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))
}

/// HTTP client for the jobs API rooted at a base URL such as `http://host/api`.
#[derive(Debug, Clone)]
pub struct HttpJobClient {
    client: Client,
    base_url: Url,
}

impl HttpJobClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        // A trailing slash makes Url::join append instead of replacing the last segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client: create_http_client()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })
    }

    async fn check_status(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body: truncate_error_body(&body),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let response = Self::check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn transport(action: &str) -> impl FnOnce(reqwest::Error) -> ApiError + '_ {
    move |e| ApiError::Transport(format!("{} failed: {}", action, e))
}

#[async_trait]
impl JobApi for HttpJobClient {
    async fn create_job(&self, file: &UploadFile) -> Result<Job, ApiError> {
        let url = self.endpoint("jobs/")?;
        info!("Creating job for '{}' ({} bytes)", file.name, file.size());

        let mut part = Part::bytes(file.bytes.clone()).file_name(file.name.clone());
        if let Some(mime) = &file.mime_type {
            part = part
                .mime_str(mime)
                .map_err(|e| ApiError::Transport(format!("Invalid MIME type '{}': {}", mime, e)))?;
        }
        let form = Form::new().part("document", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport("Create job"))?;

        let job: Job = Self::decode(response).await?;
        info!("Job {} created for '{}'", job.id, file.name);
        Ok(job)
    }

    async fn get_jobs(&self) -> Result<Vec<Job>, ApiError> {
        let url = self.endpoint("jobs/")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport("List jobs"))?;
        let jobs: Vec<Job> = Self::decode(response).await?;
        debug!("Fetched {} jobs", jobs.len());
        Ok(jobs)
    }

    async fn get_job(&self, id: JobId) -> Result<Job, ApiError> {
        let url = self.endpoint(&format!("jobs/{}/", id))?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport("Get job"))?;
        let job: Job = Self::decode(response).await?;
        debug!("Job {} is {}", job.id, job.status);
        Ok(job)
    }

    async fn delete_job(&self, id: JobId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("jobs/{}/", id))?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(transport("Delete job"))?;
        Self::check_status(response).await?;
        info!("Job {} deleted", id);
        Ok(())
    }

    async fn post_chat_message(
        &self,
        job_id: JobId,
        prompt: &str,
        history: &[ChatMessage],
    ) -> Result<ChatReply, ApiError> {
        let url = self.endpoint(&format!("jobs/{}/chat/", job_id))?;
        debug!(
            "Sending chat prompt for job {} with {} history entries",
            job_id,
            history.len()
        );
        let response = self
            .client
            .post(url)
            .json(&ChatRequest { prompt, history })
            .send()
            .await
            .map_err(transport("Chat"))?;
        Self::decode(response).await
    }
}
