//! Task-list persistence.
//!
//! The optimizer only needs `load` and `save`; the JSON file layout is the
//! plain array of task records the to-do front end writes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::ordering::Task;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid task list: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Source and sink of the task list a run is started from.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn load(&self) -> Result<Vec<Task>, StoreError>;

    async fn save(&self, tasks: &[Task]) -> Result<(), StoreError>;
}

/// Task list kept as a pretty-printed JSON array on disk.
///
/// A missing file reads as an empty list.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file a save is staged in before it replaces the list.
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl TaskStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Task>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(err)),
        };
        serde_json::from_slice(&raw).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(tasks).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;
        // Stage then rename, so an interrupted save leaves the old list intact.
        let staging = self.staging_path();
        tokio::fs::write(&staging, body)
            .await
            .map_err(|err| self.io_error(err))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|err| self.io_error(err))?;
        debug!(path = %self.path.display(), count = tasks.len(), "tasks saved");
        Ok(())
    }
}

/// In-process store, for tests and ephemeral servers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.tasks.lock().await.clone())
    }

    async fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        *self.tasks.lock().await = tasks.to_vec();
        Ok(())
    }
}
