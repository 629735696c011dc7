//! Durable append-only log of resolved exchanges.
//!
//! Every resolved chat turn lands here as a [`LogEntry`] and the whole file
//! is rewritten immediately, on tokio's blocking pool. Records already in the file are kept as raw
//! JSON, so entries written by other tools survive untouched.

use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::models::LogEntry;
use crate::store;

pub struct ExchangeLog {
    path: PathBuf,
    entries: Vec<Value>,
    /// Keep at most this many entries, dropping the oldest. `None` = unbounded.
    max_entries: Option<usize>,
}

impl ExchangeLog {
    /// Opens the log at `path`, recovering to an empty log if the file is
    /// missing or unreadable.
    pub fn open(path: &Path, max_entries: Option<usize>) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: store::load_or_empty(path),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one exchange and persists the log.
    ///
    /// The in-memory entry is kept even when the save fails; the next
    /// successful append writes it out. Callers serialize appends, so saves
    /// land on disk in order.
    pub async fn append(&mut self, entry: LogEntry) -> Result<(), StoreError> {
        let value = serde_json::to_value(&entry).map_err(|source| StoreError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        self.entries.push(value);

        if let Some(max) = self.max_entries {
            if self.entries.len() > max {
                let excess = self.entries.len() - max;
                self.entries.drain(..excess);
            }
        }

        let path = self.path.clone();
        let entries = self.entries.clone();
        tokio::task::spawn_blocking(move || store::save_array(&path, &entries))
            .await
            .map_err(|e| StoreError::Io {
                path: self.path.clone(),
                source: std::io::Error::other(e),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry(user: &str, ai: &str) -> LogEntry {
        LogEntry {
            user: user.to_string(),
            ai: ai.to_string(),
        }
    }

    #[tokio::test]
    async fn test_append_persists_every_turn() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("log.json");
        let mut log = ExchangeLog::open(&path, None);
        assert!(log.is_empty());

        log.append(entry("halo", "hai")).await.unwrap();
        log.append(entry("halo", "hai")).await.unwrap();

        let on_disk = store::load_array(&path).unwrap();
        assert_eq!(on_disk.len(), 2, "duplicates are not collapsed");
        assert_eq!(on_disk[0], json!({"user": "halo", "ai": "hai"}));
    }

    #[tokio::test]
    async fn test_existing_records_pass_through() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("log.json");
        store::save_array(&path, &[json!({"legacy": true})]).unwrap();

        let mut log = ExchangeLog::open(&path, None);
        log.append(entry("a", "b")).await.unwrap();

        let on_disk = store::load_array(&path).unwrap();
        assert_eq!(on_disk, vec![json!({"legacy": true}), json!({"user": "a", "ai": "b"})]);
    }

    #[tokio::test]
    async fn test_retention_drops_oldest() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("log.json");
        let mut log = ExchangeLog::open(&path, Some(2));

        for i in 0..5 {
            log.append(entry(&format!("q{}", i), "a")).await.unwrap();
        }

        let on_disk = store::load_array(&path).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(on_disk[0]["user"], "q3");
        assert_eq!(on_disk[1]["user"], "q4");
    }
}
