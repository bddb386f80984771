pub mod api;
pub mod broadcast;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod poll;
pub mod upload;

pub use api::{
    format_size, ChatMessage, ChatReply, ChatRole, HttpJobClient, Job, JobApi, JobId, JobStatus,
    UploadFile,
};
pub use broadcast::{JobListInvalidator, Notification, NotificationBroadcaster, NotificationLevel};
pub use chat::ChatSession;
pub use config::{load_config, Config};
pub use dashboard::Dashboard;
pub use error::{ApiError, ChatError, ConfigError, DocdashError, Result, UploadError};
pub use jobs::{JobDetail, JobListSnapshot, JobListViewModel, JobRow};
pub use poll::{PollTask, StopSignal};
pub use upload::{LocalId, UploadCoordinator, UploadItem, UploadPhase, UploadSnapshot};
