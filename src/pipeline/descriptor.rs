//! Self-description of the selection task for task runners.
//!
//! A task runner lists available tasks and their arguments before invoking
//! one; this is the metadata it reads.

use serde::{Deserialize, Serialize};

/// Describes one argument accepted by a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub arg_type: String,
    pub description: String,
    pub optional: bool,
}

/// Describes one dataset slot a task consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    pub description: String,
}

/// Metadata for a callable task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub name: String,
    pub version: String,
    pub description: String,
    pub arguments: Vec<ArgumentSpec>,
    pub datasets: Vec<DatasetSpec>,
}

impl TaskDescriptor {
    /// Descriptor for the BADGE active-learning selection task.
    pub fn active_learning() -> Self {
        Self {
            name: "Active Learning".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Selects samples from the pool using BADGE based on a trained model."
                .to_string(),
            arguments: vec![
                ArgumentSpec {
                    name: "experiment_name".to_string(),
                    arg_type: "str".to_string(),
                    description: "Name of the experiment to retrieve the model from.".to_string(),
                    optional: false,
                },
                ArgumentSpec {
                    name: "query_size".to_string(),
                    arg_type: "int".to_string(),
                    description: "Number of samples to select from the pool.".to_string(),
                    optional: true,
                },
            ],
            datasets: vec![DatasetSpec {
                name: "pool".to_string(),
                description: "Unlabeled pool data to predict on.".to_string(),
            }],
        }
    }

    /// Looks up an argument by name.
    pub fn argument(&self, name: &str) -> Option<&ArgumentSpec> {
        self.arguments.iter().find(|a| a.name == name)
    }
}
