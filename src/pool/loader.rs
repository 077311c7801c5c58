//! Loads a pool from a directory of preprocessed sample files.
//!
//! Each sample file holds a JSON array of numbers: the model-ready input
//! vector for one sample. Files are ordered by their path relative to the
//! pool root, and that order becomes the pool order.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{Pool, PoolSample};
use crate::error::DataError;

const DEFAULT_EXTENSIONS: &[&str] = &["json"];

/// Reads a directory of sample files into a [`Pool`].
#[derive(Debug, Clone)]
pub struct PoolLoader {
    root: PathBuf,
    extensions: Vec<String>,
    input_scale: f32,
}

impl PoolLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            input_scale: 1.0,
        }
    }

    /// Restricts loading to files with these extensions (case-insensitive).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    /// Multiplies every input value by `scale` (e.g. `1.0 / 255.0` for raw pixels).
    pub fn with_input_scale(mut self, scale: f32) -> Self {
        self.input_scale = scale;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads the pool.
    ///
    /// Unreadable or malformed files are skipped with a warning. The first
    /// sample that loads fixes the input width; later samples of a different
    /// width are skipped as corrupt.
    ///
    /// # Errors
    ///
    /// - `DataError::PoolNotFound` if the root directory does not exist
    /// - `DataError::EmptyPool` if no sample survives
    pub fn load(&self) -> Result<Pool, DataError> {
        if !self.root.is_dir() {
            return Err(DataError::PoolNotFound(self.root.display().to_string()));
        }

        let mut paths: Vec<(String, PathBuf)> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable pool entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.has_allowed_extension(entry.path()))
            .map(|entry| {
                let relative = entry
                    .path()
                    .strip_prefix(&self.root)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .replace('\\', "/");
                (relative, entry.into_path())
            })
            .collect();
        paths.sort_by(|a, b| a.0.cmp(&b.0));

        let mut samples: Vec<PoolSample> = Vec::with_capacity(paths.len());
        let mut input_dim: Option<usize> = None;
        let mut skipped = 0usize;

        for (name, path) in paths {
            let input = match self.read_sample(&path) {
                Ok(input) => input,
                Err(reason) => {
                    warn!(path = %path.display(), reason = %reason, "Skipping pool sample");
                    skipped += 1;
                    continue;
                }
            };

            match input_dim {
                None => input_dim = Some(input.len()),
                Some(dim) if dim != input.len() => {
                    warn!(
                        path = %path.display(),
                        expected = dim,
                        actual = input.len(),
                        "Skipping pool sample with mismatched width"
                    );
                    skipped += 1;
                    continue;
                }
                Some(_) => {}
            }

            debug!(name = %name, "Loaded pool sample");
            samples.push(PoolSample::new(samples.len(), name, input));
        }

        if samples.is_empty() {
            return Err(DataError::EmptyPool);
        }

        info!(
            root = %self.root.display(),
            loaded = samples.len(),
            skipped,
            "Pool loaded"
        );

        Pool::from_samples(samples)
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }

    fn read_sample(&self, path: &Path) -> Result<Vec<f32>, String> {
        let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        let values: Vec<f32> = serde_json::from_str(&contents).map_err(|e| e.to_string())?;

        if values.is_empty() {
            return Err("empty input vector".to_string());
        }

        let scaled: Vec<f32> = values.iter().map(|v| v * self.input_scale).collect();
        if scaled.iter().any(|v| !v.is_finite()) {
            return Err("non-finite input value".to_string());
        }

        Ok(scaled)
    }
}
