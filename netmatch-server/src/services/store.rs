//! Submission store
//!
//! Upsert-by-identity collection of [`Submission`] records persisted as a
//! single pretty-printed JSON array document.
//!
//! Writes are serialized through one writer lock. Each upsert builds the next
//! snapshot, writes it to `<snapshot>.tmp`, fsyncs, and renames it over the
//! snapshot before the in-memory view is swapped. A failed write therefore
//! leaves both the in-memory view and the on-disk snapshot at the previous
//! state. Readers clone the current view under a read lock and never observe
//! a half-applied upsert.

use netmatch_common::Submission;
use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Snapshot document name inside the data folder
pub const SNAPSHOT_FILE_NAME: &str = "submissions.json";

/// Submission store errors
///
/// Display strings carry no filesystem paths; paths are logged instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Snapshot could not be written; previous snapshot remains authoritative
    #[error("Failed to write submission snapshot: {0}")]
    StorageWriteFailed(#[source] io::Error),

    /// Snapshot exists but could not be read
    #[error("Failed to read submission snapshot: {0}")]
    StorageReadFailed(#[source] io::Error),

    /// Snapshot exists but is not a valid submission document
    #[error("Submission snapshot is corrupt: {0}")]
    CorruptStore(String),

    /// No record matched the lookup
    #[error("Submission not found: {0}")]
    NotFound(String),
}

/// Persistent submission collection keyed by `user_id`
#[derive(Debug)]
pub struct SubmissionStore {
    path: PathBuf,
    records: RwLock<Vec<Submission>>,
    writer: Mutex<()>,
}

impl SubmissionStore {
    /// Open the snapshot at `path`
    ///
    /// An absent snapshot is created empty (parent folders included). A
    /// snapshot that exists but does not parse, or that holds the same
    /// `user_id` twice, fails with [`StoreError::CorruptStore`].
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let records: Vec<Submission> = serde_json::from_slice(&bytes).map_err(|e| {
                    warn!(path = %path.display(), error = %e, "Submission snapshot failed to parse");
                    StoreError::CorruptStore(e.to_string())
                })?;
                check_unique(&records)?;
                info!(
                    path = %path.display(),
                    records = records.len(),
                    "Loaded submission snapshot"
                );
                records
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(StoreError::StorageWriteFailed)?;
                }
                let records = Vec::new();
                write_snapshot(&path, &records)
                    .await
                    .map_err(StoreError::StorageWriteFailed)?;
                info!(path = %path.display(), "Created empty submission snapshot");
                records
            }
            Err(e) => return Err(StoreError::StorageReadFailed(e)),
        };

        Ok(Self {
            path,
            records: RwLock::new(records),
            writer: Mutex::new(()),
        })
    }

    /// Open `<data_folder>/submissions.json`
    pub async fn open_in(data_folder: &Path) -> Result<Self, StoreError> {
        Self::open(data_folder.join(SNAPSHOT_FILE_NAME)).await
    }

    /// Insert or replace the record with the same `user_id`
    ///
    /// A replaced record keeps its position. Returns the record count after
    /// the snapshot has been flushed.
    pub async fn upsert(&self, submission: Submission) -> Result<usize, StoreError> {
        let _writer = self.writer.lock().await;

        let mut next = self.records.read().await.clone();
        let user_id = submission.user_id.clone();
        let replaced = match next.iter().position(|s| s.user_id == submission.user_id) {
            Some(index) => {
                next[index] = submission;
                true
            }
            None => {
                next.push(submission);
                false
            }
        };

        if let Err(e) = write_snapshot(&self.path, &next).await {
            warn!(
                path = %self.path.display(),
                user_id = %user_id,
                error = %e,
                "Submission snapshot write failed, keeping previous state"
            );
            return Err(StoreError::StorageWriteFailed(e));
        }

        let size = next.len();
        *self.records.write().await = next;

        debug!(user_id = %user_id, replaced, size, "Submission stored");
        Ok(size)
    }

    /// Current snapshot in insertion order
    pub async fn all(&self) -> Vec<Submission> {
        self.records.read().await.clone()
    }

    /// Record for `user_id`, if any
    pub async fn get(&self, user_id: &str) -> Option<Submission> {
        self.records
            .read()
            .await
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned()
    }

    /// First record whose first and last names match, ignoring case
    pub async fn find_by_name(&self, first: &str, last: &str) -> Result<Submission, StoreError> {
        self.records
            .read()
            .await
            .iter()
            .find(|s| s.has_name(first, last))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", first, last)))
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot location on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot document name, safe to report to clients
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| SNAPSHOT_FILE_NAME.to_string())
    }
}

fn check_unique(records: &[Submission]) -> Result<(), StoreError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.user_id.as_str()) {
            return Err(StoreError::CorruptStore(format!(
                "duplicate user_id {}",
                record.user_id
            )));
        }
    }
    Ok(())
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Atomic snapshot write: temp file, fsync, rename, fsync parent folder
async fn write_snapshot(target: &Path, records: &[Submission]) -> io::Result<()> {
    let bytes = serde_json::to_vec_pretty(records)?;
    let temp = temp_path(target);

    let result = async {
        let mut file = tokio::fs::File::create(&temp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp, target).await
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&temp).await;
        return result;
    }
    sync_parent(target).await
}

/// Flush the folder entry so a completed rename survives a crash
#[cfg(unix)]
async fn sync_parent(target: &Path) -> io::Result<()> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    tokio::fs::File::open(parent).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_parent(_target: &Path) -> io::Result<()> {
    Ok(())
}
