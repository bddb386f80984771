use std::path::{Path, PathBuf};

use log::{debug, info};
use reqwest::Url;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub const ENV_BACKEND_DEV: &str = "DOCDASH_BACKEND_DEV";
pub const ENV_BACKEND_URL: &str = "DOCDASH_BACKEND_URL";
pub const ENV_HOST: &str = "DOCDASH_HOST";

/// `<config dir>/docdash/config.yaml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("docdash").join("config.yaml"))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    info!("Loaded config from {}", path.display());
    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = if content.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(content)?
    };

    validate_config(&config)?;

    Ok(config)
}

impl Config {
    /// Loads `path` (or the default path when it exists), then applies
    /// `DOCDASH_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => load_config(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => load_config(path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Config::default()
                }
            },
        };

        config.apply_env_overrides();
        validate_config(&config)?;
        Ok(config)
    }

    /// Defaults plus `DOCDASH_*` overrides, ignoring any config file.
    pub fn from_env_or_default() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(dev_url) = std::env::var(ENV_BACKEND_DEV) {
            self.backend.dev_url = dev_url;
        }
        if let Ok(url) = std::env::var(ENV_BACKEND_URL) {
            self.backend.url = url;
        }
        if let Ok(host) = std::env::var(ENV_HOST) {
            self.backend.host = host;
        }
    }
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_url("backend.dev_url", &config.backend.dev_url)?;
    validate_url("backend.url", &config.backend.url)?;

    if config.poll.upload_interval_ms == 0 {
        return Err(validation("poll.upload_interval_ms must be greater than 0"));
    }
    if config.poll.job_interval_ms == 0 {
        return Err(validation("poll.job_interval_ms must be greater than 0"));
    }
    if config.poll.failure_warn_threshold == 0 {
        return Err(validation("poll.failure_warn_threshold must be at least 1"));
    }
    if config.chat.history_window == 0 {
        return Err(validation("chat.history_window must be at least 1"));
    }

    Ok(())
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| validation(&format!("{} '{}' is not a valid URL: {}", field, value, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(validation(&format!(
            "{} must use http or https, got '{}'",
            field,
            url.scheme()
        )));
    }

    Ok(())
}

fn validation(message: &str) -> ConfigError {
    ConfigError::Validation {
        message: message.to_string(),
    }
}
