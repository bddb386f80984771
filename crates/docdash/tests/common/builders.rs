//! Builders for test data.

#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, Utc};

use docdash::config::Config;
use docdash::{Job, JobId, JobStatus, UploadFile};

/// Builder for `Job` values as the backend would return them.
pub struct JobBuilder {
    id: JobId,
    status: JobStatus,
    result: Option<String>,
    document: Option<String>,
    age_secs: i64,
}

impl JobBuilder {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            result: None,
            document: Some(format!("documents/doc-{}.pdf", id)),
            age_secs: 0,
        }
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn result(mut self, result: &str) -> Self {
        self.result = Some(result.to_string());
        self
    }

    pub fn document(mut self, document: &str) -> Self {
        self.document = Some(document.to_string());
        self
    }

    pub fn without_document(mut self) -> Self {
        self.document = None;
        self
    }

    pub fn age_secs(mut self, secs: i64) -> Self {
        self.age_secs = secs;
        self
    }

    pub fn build(self) -> Job {
        let created_at = Utc::now() - ChronoDuration::seconds(self.age_secs);
        Job {
            id: self.id,
            status: self.status,
            result: self.result,
            document: self.document,
            created_at,
            updated_at: created_at,
        }
    }
}

pub fn job(id: JobId, status: JobStatus) -> Job {
    JobBuilder::new(id).status(status).build()
}

pub fn pdf(name: &str) -> UploadFile {
    UploadFile::new(name, format!("%PDF-1.4 {}", name).into_bytes())
}

/// Builder for `Config` with test-friendly defaults.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn upload_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll.upload_interval_ms = ms;
        self
    }

    pub fn job_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll.job_interval_ms = ms;
        self
    }

    pub fn failure_warn_threshold(mut self, threshold: u32) -> Self {
        self.config.poll.failure_warn_threshold = threshold;
        self
    }

    pub fn history_window(mut self, window: usize) -> Self {
        self.config.chat.history_window = window;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
