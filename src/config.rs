use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{MonitorError, Result};

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const SFTP_HOST: &str = "SFTP_HOST";
    pub const SFTP_PORT: &str = "SFTP_PORT";
    pub const SFTP_USER: &str = "SFTP_USER";
    pub const SFTP_PASS: &str = "SFTP_PASS";
    pub const SFTP_FOLDER: &str = "SFTP_FOLDER";
    pub const ALERT_AGE_HOURS: &str = "ALERT_AGE_HOURS";
    pub const SMTP_SERVER: &str = "SMTP_SERVER";
    pub const SMTP_PORT: &str = "SMTP_PORT";
    pub const SENDER_EMAIL: &str = "SENDER_EMAIL";
    pub const SENDER_EMAIL_PASSWORD: &str = "SENDER_EMAIL_PASSWORD";
    pub const RECEIVER_EMAIL: &str = "RECEIVER_EMAIL";
    pub const ALERTED_FILES_PATH: &str = "ALERTED_FILES_PATH";
    pub const ALERT_SUBJECT: &str = "ALERT_SUBJECT";
}

/// Default values
pub mod defaults {
    pub const SFTP_PORT: u16 = 22;
    pub const SMTP_PORT: u16 = 587;
    pub const ALERT_AGE_HOURS: u64 = 6;
    pub const ALERTED_FILES_PATH: &str = "alerted_files.txt";
    pub const ALERT_SUBJECT: &str = "SFTP File Alert";
}

/// Everything one run needs, built once at startup and passed by reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sftp: SftpConfig,
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub alert: AlertConfig,
}

#[derive(Clone, Deserialize)]
pub struct SftpConfig {
    pub host: String,
    #[serde(default = "default_sftp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    pub folder: String,
}

#[derive(Clone, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub sender: String,
    pub sender_password: String,
    pub receiver: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Files older than this many hours are stale
    pub age_hours: u64,
    /// Line-per-name file holding names already alerted on
    pub store_path: PathBuf,
    pub subject: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            age_hours: defaults::ALERT_AGE_HOURS,
            store_path: PathBuf::from(defaults::ALERTED_FILES_PATH),
            subject: defaults::ALERT_SUBJECT.to_string(),
        }
    }
}

fn default_sftp_port() -> u16 {
    defaults::SFTP_PORT
}

fn default_smtp_port() -> u16 {
    defaults::SMTP_PORT
}

// Passwords never reach the log.
impl fmt::Debug for SftpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SftpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("folder", &self.folder)
            .finish()
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("sender_password", &"<redacted>")
            .field("receiver", &self.receiver)
            .finish()
    }
}

impl Config {
    /// Builds the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    ///
    /// Required keys that are unset or blank fail with a `Config` error naming
    /// the key; optional keys fall back to [`defaults`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| get(key).ok_or_else(|| MonitorError::missing(key));
        // Passwords are taken verbatim; surrounding spaces may be part of them.
        let secret = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| MonitorError::missing(key))
        };

        let config = Config {
            sftp: SftpConfig {
                host: required(env_vars::SFTP_HOST)?,
                port: parse_or(get(env_vars::SFTP_PORT), env_vars::SFTP_PORT, defaults::SFTP_PORT)?,
                username: required(env_vars::SFTP_USER)?,
                password: secret(env_vars::SFTP_PASS)?,
                folder: required(env_vars::SFTP_FOLDER)?,
            },
            smtp: SmtpConfig {
                server: required(env_vars::SMTP_SERVER)?,
                port: parse_or(get(env_vars::SMTP_PORT), env_vars::SMTP_PORT, defaults::SMTP_PORT)?,
                sender: required(env_vars::SENDER_EMAIL)?,
                sender_password: secret(env_vars::SENDER_EMAIL_PASSWORD)?,
                receiver: required(env_vars::RECEIVER_EMAIL)?,
            },
            alert: AlertConfig {
                age_hours: parse_or(
                    get(env_vars::ALERT_AGE_HOURS),
                    env_vars::ALERT_AGE_HOURS,
                    defaults::ALERT_AGE_HOURS,
                )?,
                store_path: get(env_vars::ALERTED_FILES_PATH)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(defaults::ALERTED_FILES_PATH)),
                subject: get(env_vars::ALERT_SUBJECT)
                    .unwrap_or_else(|| defaults::ALERT_SUBJECT.to_string()),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document with `[sftp]`, `[smtp]` and optional `[alert]` tables.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Config = toml::from_str(source).map_err(|e| MonitorError::Config {
            key: "toml".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| MonitorError::Config {
            key: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    /// Rejects blank required fields, which TOML happily deserializes.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("sftp.host", &self.sftp.host),
            ("sftp.username", &self.sftp.username),
            ("sftp.password", &self.sftp.password),
            ("sftp.folder", &self.sftp.folder),
            ("smtp.server", &self.smtp.server),
            ("smtp.sender", &self.smtp.sender),
            ("smtp.sender_password", &self.smtp.sender_password),
            ("smtp.receiver", &self.smtp.receiver),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(MonitorError::missing(key));
            }
        }
        Ok(())
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(value) => value
            .parse()
            .map_err(|e| MonitorError::invalid(key, &value, e)),
        None => Ok(default),
    }
}
