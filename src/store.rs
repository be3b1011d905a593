use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{MonitorError, Result};

/// Persistence for the names that have already triggered an alert.
pub trait AlertStore: Send + Sync {
    /// Every name alerted on so far. An absent store is an empty set.
    fn load(&self) -> Result<HashSet<String>>;

    /// Records `names` as alerted. Never rewrites earlier entries.
    fn append(&self, names: &[String]) -> Result<()>;
}

/// Append-only text file holding one filename per line.
///
/// Backslash, newline and carriage return inside a name are written as `\\`,
/// `\n` and `\r` so every name survives a round trip on one line.
/// There is no locking: two processes appending at once may interleave lines.
pub struct LineFileStore {
    path: PathBuf,
}

impl LineFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names in the order they were written, blank lines skipped.
    pub fn entries(&self) -> Result<Vec<String>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No alerted-files store at {:?} yet", self.path);
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.error(e)),
        };

        Ok(text
            .lines()
            .filter(|line| !line.is_empty())
            .map(unescape)
            .collect())
    }

    fn error(&self, source: io::Error) -> MonitorError {
        MonitorError::Store {
            path: self.path.clone(),
            source,
        }
    }
}

impl AlertStore for LineFileStore {
    fn load(&self) -> Result<HashSet<String>> {
        Ok(self.entries()?.into_iter().collect())
    }

    fn append(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }

        let mut buffer = String::new();
        for name in names {
            buffer.push_str(&escape(name));
            buffer.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.error(e))?;
        file.write_all(buffer.as_bytes()).map_err(|e| self.error(e))?;
        file.flush().map_err(|e| self.error(e))?;

        log::debug!("Appended {} name(s) to {:?}", names.len(), self.path);
        Ok(())
    }
}

fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

// Unknown escapes are kept verbatim.
fn unescape(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = LineFileStore::new(dir.path().join("alerted_files.txt"));

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn appends_accumulate_across_calls() {
        let dir = TempDir::new().unwrap();
        let store = LineFileStore::new(dir.path().join("alerted_files.txt"));

        store.append(&names(&["a.txt"])).unwrap();
        store.append(&names(&["b.txt", "c.txt"])).unwrap();

        assert_eq!(store.entries().unwrap(), names(&["a.txt", "b.txt", "c.txt"]));
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "a.txt\nb.txt\nc.txt\n"
        );
    }

    #[test]
    fn ignores_blank_lines_and_crlf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("alerted_files.txt");
        fs::write(&path, "a.txt\r\n\nb.txt\n\n").unwrap();

        let loaded = LineFileStore::new(&path).load().unwrap();

        let expected: HashSet<String> = names(&["a.txt", "b.txt"]).into_iter().collect();
        assert_eq!(loaded, expected);
    }

    #[test]
    fn names_with_line_breaks_and_backslashes_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = LineFileStore::new(dir.path().join("alerted_files.txt"));
        let awkward = names(&["weird\r", "two\nlines", "back\\slash\\n", "plain.txt"]);

        store.append(&awkward).unwrap();

        assert_eq!(store.entries().unwrap(), awkward);
        assert_eq!(
            fs::read_to_string(store.path()).unwrap().lines().count(),
            awkward.len()
        );
    }

    #[test]
    fn stored_awkward_name_is_not_alerted_twice() {
        use crate::aging::resolve;
        use crate::remote::FileRecord;
        use chrono::{Duration, Utc};

        let dir = TempDir::new().unwrap();
        let store = LineFileStore::new(dir.path().join("alerted_files.txt"));
        let now = Utc::now();
        let records = vec![
            FileRecord::new("weird\r", now - Duration::hours(7)),
            FileRecord::new("two\nlines", now - Duration::hours(8)),
        ];

        let first = resolve(&records, now, 6, &store.load().unwrap());
        store.append(&first.to_append).unwrap();
        let second = resolve(&records, now, 6, &store.load().unwrap());

        assert_eq!(first.newly_stale.len(), 2);
        assert!(second.newly_stale.is_empty());
    }

    #[test]
    fn creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = LineFileStore::new(dir.path().join("state").join("alerted.txt"));

        store.append(&names(&["x"])).unwrap();

        assert!(store.load().unwrap().contains("x"));
    }

    #[test]
    fn empty_append_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let store = LineFileStore::new(dir.path().join("alerted_files.txt"));

        store.append(&[]).unwrap();

        assert!(!store.path().exists());
    }

    #[test]
    fn unreadable_store_is_an_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be cannot be read as text.
        let store = LineFileStore::new(dir.path());

        assert!(matches!(store.load(), Err(MonitorError::Store { .. })));
    }
}
