use std::net::TcpStream;
use std::path::Path;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::DateTime;
use ssh2::{HashType, Session};

use super::{DirectoryLister, RemoteEntry};
use crate::config::SftpConfig;
use crate::error::{MonitorError, Result};

/// Lists a folder over SFTP with password authentication.
///
/// libssh2 is blocking, so every listing runs on tokio's blocking pool. A
/// fresh session is opened per listing and closed when it returns.
pub struct SftpLister {
    config: SftpConfig,
    host: String,
}

impl SftpLister {
    pub fn new(config: &SftpConfig) -> Self {
        Self {
            host: format!("{}:{}", config.host, config.port),
            config: config.clone(),
        }
    }
}

#[async_trait]
impl DirectoryLister for SftpLister {
    fn host(&self) -> &str {
        &self.host
    }

    async fn list(&self, folder: &str) -> Result<Vec<RemoteEntry>> {
        let config = self.config.clone();
        let remote_folder = folder.to_string();

        let outcome = tokio::task::spawn_blocking(move || list_blocking(&config, &remote_folder))
            .await
            .map_err(|e| anyhow::anyhow!("listing task failed: {}", e))
            .and_then(|inner| inner);

        outcome.map_err(|e| MonitorError::Listing {
            host: self.host.clone(),
            folder: folder.to_string(),
            message: format!("{:#}", e),
        })
    }
}

fn list_blocking(config: &SftpConfig, folder: &str) -> anyhow::Result<Vec<RemoteEntry>> {
    let tcp = TcpStream::connect((config.host.as_str(), config.port))
        .with_context(|| format!("connecting to {}:{}", config.host, config.port))?;

    let mut session = Session::new().context("creating SSH session")?;
    session.set_tcp_stream(tcp);
    session.handshake().context("SSH handshake")?;

    // Host keys are accepted as presented; record the fingerprint for audit.
    if let Some(hash) = session.host_key_hash(HashType::Sha256) {
        let fingerprint: Vec<String> = hash.iter().map(|b| format!("{:02x}", b)).collect();
        log::debug!("{} host key SHA256 {}", config.host, fingerprint.join(":"));
    }

    session
        .userauth_password(&config.username, &config.password)
        .with_context(|| format!("authenticating as {}", config.username))?;
    if !session.authenticated() {
        bail!("server rejected credentials for {}", config.username);
    }

    let sftp = session.sftp().context("opening SFTP channel")?;
    let listing = sftp
        .readdir(Path::new(folder))
        .with_context(|| format!("reading directory {}", folder))?;

    let mut entries = Vec::with_capacity(listing.len());
    for (path, stat) in listing {
        let name = match entry_name(&path) {
            Some(name) => name,
            None => continue,
        };
        entries.push(RemoteEntry {
            name,
            is_dir: stat.is_dir(),
            modified_at: stat
                .mtime
                .and_then(|secs| DateTime::from_timestamp(secs as i64, 0)),
        });
    }

    drop(sftp);
    if let Err(e) = session.disconnect(None, "listing complete", None) {
        log::debug!("SSH disconnect from {} failed: {}", config.host, e);
    }

    log::debug!("Listed {} entries in {} on {}", entries.len(), folder, config.host);
    Ok(entries)
}

/// Final path component as text, `None` for `.`, `..` and empty paths.
///
/// Bytes that are not UTF-8 are replaced with U+FFFD so the file still gets an
/// alert; two such names differing only in those bytes share one store entry.
fn entry_name(path: &Path) -> Option<String> {
    let raw = path.file_name()?;
    let name = match raw.to_str() {
        Some(name) => name.to_string(),
        None => {
            let lossy = raw.to_string_lossy().into_owned();
            log::warn!("Entry {:?} has a non UTF-8 name, reporting it as {:?}", path, lossy);
            lossy
        }
    };
    if name == "." || name == ".." {
        return None;
    }
    Some(name)
}
