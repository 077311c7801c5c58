//! Resolves experiment names to loaded models.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use super::{DenseSoftmaxModel, EmbeddingModel};
use crate::error::ModelLoadError;

/// Supplies a trained model for an experiment.
pub trait ModelProvider: Send + Sync {
    fn load(&self, experiment_name: &str) -> Result<Arc<dyn EmbeddingModel>, ModelLoadError>;
}

/// Provider backed by a directory tree: `<root>/<experiment>/<model>.json`.
///
/// When an experiment directory holds several model files, the first one in
/// file name order is used.
#[derive(Debug, Clone)]
pub struct DirectoryModelRegistry {
    root: PathBuf,
}

impl DirectoryModelRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn find_artifact(&self, dir: &Path) -> Result<PathBuf, ModelLoadError> {
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| ext.eq_ignore_ascii_case("json"))
                        .unwrap_or(false)
            })
            .collect();
        candidates.sort();

        candidates
            .into_iter()
            .next()
            .ok_or_else(|| ModelLoadError::NoArtifact(dir.display().to_string()))
    }
}

impl ModelProvider for DirectoryModelRegistry {
    fn load(&self, experiment_name: &str) -> Result<Arc<dyn EmbeddingModel>, ModelLoadError> {
        let dir = self.root.join(experiment_name);
        if !dir.is_dir() {
            return Err(ModelLoadError::NotFound(experiment_name.to_string()));
        }

        let path = self.find_artifact(&dir)?;
        let contents = std::fs::read_to_string(&path)?;
        let model = DenseSoftmaxModel::from_json(&contents).map_err(|reason| {
            ModelLoadError::Invalid {
                path: path.display().to_string(),
                reason,
            }
        })?;

        info!(
            experiment = experiment_name,
            path = %path.display(),
            classes = model.num_classes(),
            "Loaded model"
        );

        Ok(Arc::new(model))
    }
}
