//! Metadata index
//!
//! Authoritative mapping from file name to its ordered chunk identifiers.
//! All access goes through one mutex. When a snapshot path is configured,
//! every mutation rewrites the whole index to disk before the lock is
//! released; a failed write rolls the in-memory change back so memory and
//! disk never disagree.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SNAPSHOT_VERSION: u32 = 1;

/// Metadata for one stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Chunk identifiers; position is the chunk's sequence index
    pub chunks: Vec<String>,
    /// Topology fingerprint at upload time
    pub topology: String,
    /// Unix timestamp (seconds) of the upload
    pub created_at: i64,
}

impl FileEntry {
    pub fn new(chunks: Vec<String>, topology: impl Into<String>) -> Self {
        Self {
            chunks,
            topology: topology.into(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// On-disk snapshot format
#[derive(Debug, Deserialize)]
struct Snapshot {
    version: u32,
    files: HashMap<String, FileEntry>,
}

/// Borrowed view of the index, encoded with the same layout as `Snapshot`
#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    files: &'a HashMap<String, FileEntry>,
}

/// Metadata index
pub struct MetadataIndex {
    files: Mutex<HashMap<String, FileEntry>>,
    snapshot_path: Option<PathBuf>,
}

impl MetadataIndex {
    /// Index without persistence
    pub fn in_memory() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            snapshot_path: None,
        }
    }

    /// Open a persistent index, loading the last snapshot if one exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let files = match fs::read(&path) {
            Ok(bytes) => {
                let snapshot: Snapshot = bincode::deserialize(&bytes)
                    .map_err(|e| Error::MetadataCorrupted(e.to_string()))?;
                if snapshot.version != SNAPSHOT_VERSION {
                    return Err(Error::MetadataCorrupted(format!(
                        "unsupported snapshot version {}",
                        snapshot.version
                    )));
                }
                tracing::info!(
                    "Loaded metadata snapshot from {} ({} files)",
                    path.display(),
                    snapshot.files.len()
                );
                snapshot.files
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No metadata snapshot at {}, starting empty", path.display());
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            files: Mutex::new(files),
            snapshot_path: Some(path),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FileEntry>> {
        // Mutations roll back before unlocking, so a poisoned map is still consistent.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or wholesale-replace the entry for `name`.
    ///
    /// Returns the entry that was replaced, if any.
    pub fn put(&self, name: &str, entry: FileEntry) -> Result<Option<FileEntry>> {
        let mut files = self.lock();
        let previous = files.insert(name.to_string(), entry);

        if let Err(e) = self.persist(&files) {
            match previous {
                Some(old) => {
                    files.insert(name.to_string(), old);
                }
                None => {
                    files.remove(name);
                }
            }
            return Err(e);
        }

        Ok(previous)
    }

    /// Entry for `name`
    pub fn get(&self, name: &str) -> Result<FileEntry> {
        self.lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Remove `name`, returning the entry that existed
    pub fn delete(&self, name: &str) -> Result<FileEntry> {
        let mut files = self.lock();
        let removed = files
            .remove(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;

        if let Err(e) = self.persist(&files) {
            files.insert(name.to_string(), removed);
            return Err(e);
        }

        Ok(removed)
    }

    /// Remove `name` only if `check` accepts the current entry.
    ///
    /// Lookup, check and removal happen under one lock acquisition.
    pub fn delete_if<F>(&self, name: &str, check: F) -> Result<FileEntry>
    where
        F: FnOnce(&FileEntry) -> Result<()>,
    {
        let mut files = self.lock();
        let entry = files
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        check(entry)?;

        let removed = files
            .remove(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        if let Err(e) = self.persist(&files) {
            files.insert(name.to_string(), removed);
            return Err(e);
        }

        Ok(removed)
    }

    /// Snapshot of all file names, sorted
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of all entries, sorted by name
    pub fn entries(&self) -> Vec<(String, FileEntry)> {
        let mut entries: Vec<(String, FileEntry)> = self
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_persistent(&self) -> bool {
        self.snapshot_path.is_some()
    }

    /// Write the full index: temp file, fsync, rename over the snapshot.
    fn persist(&self, files: &HashMap<String, FileEntry>) -> Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION,
            files,
        };

        write_snapshot(path, &snapshot).map_err(|e| {
            tracing::error!("Failed to persist metadata to {}: {}", path.display(), e);
            Error::PersistenceFailure(format!("{}: {}", path.display(), e))
        })?;

        tracing::debug!("Persisted metadata ({} files)", files.len());
        Ok(())
    }
}

/// Sibling temp file: `<snapshot path>.tmp`, never the snapshot itself
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_snapshot(path: &Path, snapshot: &SnapshotRef<'_>) -> Result<()> {
    let bytes = bincode::serialize(snapshot)
        .map_err(|e| Error::Internal(format!("Serialize error: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
