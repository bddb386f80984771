//! Composition root wiring the client, uploads, job list and notifications.

use std::sync::Arc;

use log::info;

use crate::api::{HttpJobClient, JobApi, JobId};
use crate::broadcast::{JobListInvalidator, NotificationBroadcaster};
use crate::chat::ChatSession;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::jobs::{JobDetail, JobListViewModel};
use crate::upload::UploadCoordinator;

/// Everything the dashboard page owns. Dropping it stops all polling.
///
/// Must be created inside a tokio runtime.
pub struct Dashboard {
    config: Config,
    api: Arc<dyn JobApi>,
    notifications: NotificationBroadcaster,
    invalidator: JobListInvalidator,
    uploads: UploadCoordinator,
    jobs: JobListViewModel,
}

impl Dashboard {
    /// Talks to the backend selected by `config.backend`.
    pub fn new(config: Config) -> Result<Self> {
        let client = HttpJobClient::new(config.backend.base_url())?;
        info!("Using backend {}", client.base_url());
        Ok(Self::with_api(config, Arc::new(client)))
    }

    pub fn with_api(config: Config, api: Arc<dyn JobApi>) -> Self {
        let notifications = NotificationBroadcaster::default();
        let invalidator = JobListInvalidator::default();

        let uploads = UploadCoordinator::new(
            Arc::clone(&api),
            &config.poll,
            notifications.clone(),
            invalidator.clone(),
        );
        let jobs = JobListViewModel::new(Arc::clone(&api), &config.poll, notifications.clone());

        Self {
            config,
            api,
            notifications,
            invalidator,
            uploads,
            jobs,
        }
    }

    /// Loads the job list and starts refreshing it on upload progress.
    pub async fn activate(&mut self) -> std::result::Result<(), ApiError> {
        self.jobs.listen_for_invalidations(self.invalidator.subscribe());
        self.jobs.activate().await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api(&self) -> Arc<dyn JobApi> {
        Arc::clone(&self.api)
    }

    pub fn notifications(&self) -> &NotificationBroadcaster {
        &self.notifications
    }

    pub fn invalidator(&self) -> &JobListInvalidator {
        &self.invalidator
    }

    pub fn uploads(&self) -> &UploadCoordinator {
        &self.uploads
    }

    pub fn jobs(&self) -> &JobListViewModel {
        &self.jobs
    }

    pub fn chat_session(&self, job_id: JobId) -> ChatSession {
        ChatSession::new(
            Arc::clone(&self.api),
            job_id,
            self.config.chat.history_window,
            self.notifications.clone(),
        )
    }

    pub async fn job_detail(&self, job_id: JobId) -> std::result::Result<JobDetail, ApiError> {
        JobDetail::load(self.api.as_ref(), job_id).await
    }
}
