//! Workspace store: per-team file CRUD on the local filesystem.
//!
//! Every path is resolved through [`crate::path::resolve`] before any
//! filesystem access, so the store can only touch files under the sandboxed
//! team root. Team roots are created lazily on first write; a team that has
//! never written anything simply lists as empty.
//!
//! Operations are not transactional with respect to each other: two
//! concurrent writers to the same path race and the later completion wins.
//! That is an accepted property of the store, guarded only by the
//! filesystem's own per-file write atomicity.

use crate::path::{self, PathError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Error from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata for one file in a team's listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    /// `/`-joined path relative to the team root
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last modified time, milliseconds since epoch
    pub last_modified: u64,
}

/// A file's content together with its last-modified time.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub content: String,
    pub last_modified: u64,
}

/// Per-team file storage rooted at a single data directory.
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    data_root: PathBuf,
}

impl WorkspaceStore {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    /// Create or overwrite a file, creating parent directories as needed.
    pub async fn write(&self, team: &str, rel_path: &str, content: &str) -> Result<(), StoreError> {
        let abs = path::resolve(&self.data_root, team, rel_path)?;
        if let Some(parent) = abs.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&abs, content).await?;
        debug!(team = %team, path = %rel_path, bytes = content.len(), "wrote file");
        Ok(())
    }

    /// Read a file's content and last-modified time.
    pub async fn read(&self, team: &str, rel_path: &str) -> Result<StoredFile, StoreError> {
        let abs = path::resolve(&self.data_root, team, rel_path)?;
        let content = match tokio::fs::read_to_string(&abs).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(rel_path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let meta = tokio::fs::metadata(&abs).await?;
        Ok(StoredFile {
            content,
            last_modified: modified_millis(&meta),
        })
    }

    /// Recursively list all files (not folders) under a team's root.
    ///
    /// A team root that does not exist yet is an empty listing, not an error.
    pub async fn list(&self, team: &str) -> Result<Vec<FileMeta>, StoreError> {
        let root = path::team_root(&self.data_root, team);
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(dir) = stack.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let entry_path = entry.path();
                let meta = entry.metadata().await?;
                if meta.is_dir() {
                    stack.push(entry_path);
                } else {
                    files.push(FileMeta {
                        name: relative_name(&root, &entry_path),
                        size: meta.len(),
                        last_modified: modified_millis(&meta),
                    });
                }
            }
        }
        Ok(files)
    }

    /// Delete a single file.
    pub async fn remove(&self, team: &str, rel_path: &str) -> Result<(), StoreError> {
        let abs = path::resolve(&self.data_root, team, rel_path)?;
        match tokio::fs::remove_file(&abs).await {
            Ok(()) => {
                debug!(team = %team, path = %rel_path, "removed file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(rel_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create a directory and all intermediate segments. Idempotent.
    pub async fn mkdir(&self, team: &str, dir_path: &str) -> Result<(), StoreError> {
        let abs = path::resolve(&self.data_root, team, dir_path)?;
        tokio::fs::create_dir_all(&abs).await?;
        debug!(team = %team, path = %dir_path, "created directory");
        Ok(())
    }
}

/// The `/`-joined path of `entry` relative to `root`.
fn relative_name(root: &Path, entry: &Path) -> String {
    entry
        .strip_prefix(root)
        .unwrap_or(entry)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn modified_millis(meta: &std::fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64
        })
}
