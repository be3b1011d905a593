pub mod sftp;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

pub use sftp::SftpLister;

/// One entry of a remote directory listing, exactly as the server reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub is_dir: bool,
    /// `None` when the server did not report a modification time
    pub modified_at: Option<DateTime<Utc>>,
}

/// A plain file with a known modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub modified_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(name: impl Into<String>, modified_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            modified_at,
        }
    }
}

/// Source of a point-in-time listing of one remote folder.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// Host description used in logs and errors
    fn host(&self) -> &str;

    async fn list(&self, folder: &str) -> Result<Vec<RemoteEntry>>;
}

/// Keeps only plain files with a modification time, in listing order.
pub fn records_from_entries(entries: Vec<RemoteEntry>) -> Vec<FileRecord> {
    entries
        .into_iter()
        .filter_map(|entry| {
            if entry.is_dir {
                return None;
            }
            match entry.modified_at {
                Some(modified_at) => Some(FileRecord {
                    name: entry.name,
                    modified_at,
                }),
                None => {
                    log::warn!("Skipping {}: server reported no modification time", entry.name);
                    None
                }
            }
        })
        .collect()
}
