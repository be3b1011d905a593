use std::io;
use std::path::PathBuf;

/// Errors raised by one monitoring run.
///
/// Each variant carries enough context (host, folder, server, path) to
/// diagnose the failure from the log alone.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("configuration error for {key}: {reason}")]
    Config { key: String, reason: String },

    #[error("unable to list {folder} on {host}: {message}")]
    Listing {
        host: String,
        folder: String,
        message: String,
    },

    #[error("failed to send alert through {server}: {message}")]
    Mail { server: String, message: String },

    #[error("alerted-files store {path:?}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MonitorError {
    pub fn missing(key: &str) -> Self {
        MonitorError::Config {
            key: key.to_string(),
            reason: "required value is not set".to_string(),
        }
    }

    pub fn invalid(key: &str, value: &str, reason: impl std::fmt::Display) -> Self {
        MonitorError::Config {
            key: key.to_string(),
            reason: format!("invalid value {:?} ({})", value, reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
