//! Persistent storage for selection reports.
//!
//! Reports are stored per dataset as JSON at
//! `<base>/<dataset>/selection/selection.json`. Writes go to a temporary file
//! that is synced and then renamed over the final path, so readers only ever
//! see a complete artifact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::export::SelectionReport;

const SELECTION_DIR: &str = "selection";
const SELECTION_FILE: &str = "selection.json";

/// Characters not allowed in dataset names (they must be usable as path segments).
const INVALID_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Errors that can occur during selection storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to read or write to the filesystem.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize or deserialize report data.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No selection has been stored for the dataset.
    #[error("No selection stored for dataset '{0}'")]
    NotFound(String),

    /// The dataset name cannot be used as a storage key.
    #[error("Invalid dataset name '{0}': must be non-empty and contain only path-safe characters")]
    InvalidDatasetName(String),
}

/// Destination for finished selection reports.
#[async_trait]
pub trait SelectionStore: Send + Sync {
    /// Persists the report for `dataset`, replacing any previous one.
    async fn save(&self, dataset: &str, report: &SelectionReport) -> Result<PathBuf, StorageError>;

    /// Loads the latest report for `dataset`.
    async fn load(&self, dataset: &str) -> Result<SelectionReport, StorageError>;
}

/// Checks that a dataset name is usable as a single path segment.
pub fn validate_dataset_name(dataset: &str) -> Result<(), StorageError> {
    let trimmed = dataset.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || dataset.contains(INVALID_NAME_CHARS)
    {
        return Err(StorageError::InvalidDatasetName(dataset.to_string()));
    }
    Ok(())
}

/// Local file storage for selection reports.
#[derive(Debug, Clone)]
pub struct FsSelectionStore {
    base_path: PathBuf,
}

impl FsSelectionStore {
    /// Creates a store rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Returns the base storage path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the report file for `dataset`.
    pub fn selection_path(&self, dataset: &str) -> PathBuf {
        self.base_path
            .join(dataset)
            .join(SELECTION_DIR)
            .join(SELECTION_FILE)
    }
}

#[async_trait]
impl SelectionStore for FsSelectionStore {
    async fn save(&self, dataset: &str, report: &SelectionReport) -> Result<PathBuf, StorageError> {
        validate_dataset_name(dataset)?;

        let path = self.selection_path(dataset);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = report.to_json()?;
        let tmp_path = path.with_extension("json.tmp");

        if let Err(e) = write_and_replace(&tmp_path, &path, json.as_bytes()).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        info!(
            dataset,
            path = %path.display(),
            selected = report.len(),
            "Selection saved"
        );
        Ok(path)
    }

    async fn load(&self, dataset: &str) -> Result<SelectionReport, StorageError> {
        validate_dataset_name(dataset)?;

        let path = self.selection_path(dataset);
        if !path.exists() {
            return Err(StorageError::NotFound(dataset.to_string()));
        }

        let contents = fs::read_to_string(&path).await?;
        Ok(SelectionReport::from_json(&contents)?)
    }
}

/// Writes `contents` to `tmp_path`, syncs it, and renames it over `path`.
async fn write_and_replace(tmp_path: &Path, path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp_path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(tmp_path, path).await
}
