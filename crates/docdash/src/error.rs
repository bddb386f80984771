use std::path::PathBuf;
use thiserror::Error;

use crate::upload::UploadPhase;

#[derive(Error, Debug)]
pub enum DocdashError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Failures talking to the jobs backend.
///
/// Every variant carries a human-readable message; callers surface it as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to read '{path}': {reason}")]
    ReadFile { path: PathBuf, reason: String },
}

impl ApiError {
    /// The server no longer knows the requested resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Upload item not found: {0}")]
    NotFound(String),

    #[error("Upload item '{local_id}' cannot be removed while {phase}")]
    NotRemovable { local_id: String, phase: UploadPhase },

    #[error("Unsupported file type: {0}")]
    Unsupported(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Chat request failed: {0}")]
    Api(#[from] ApiError),
}

pub type Result<T> = std::result::Result<T, DocdashError>;
