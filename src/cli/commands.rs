//! CLI command definitions for label-forge.
//!
//! This module provides the command-line interface for running a BADGE
//! selection over a pool directory, inspecting a stored selection, and
//! printing the task descriptor.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use crate::error::{TaskError, TaskFailure};
use crate::model::DirectoryModelRegistry;
use crate::pipeline::{
    SelectionConfig, SelectionContext, SelectionRequest, SelectionTask, TaskDescriptor,
};
use crate::pool::PoolLoader;
use crate::storage::{FsSelectionStore, SelectionStore};

/// Active-learning sample selection for human labeling.
#[derive(Parser)]
#[command(name = "label-forge")]
#[command(about = "Select the most informative unlabeled samples with BADGE")]
#[command(version)]
#[command(
    long_about = "label-forge scores an unlabeled pool with a trained classifier and picks a diverse, informative batch for human labeling.\n\nThe selection is stored as <output>/<dataset>/selection/selection.json.\n\nExample usage:\n  label-forge select --experiment emotion --pool ./pool --dataset faces --query-size 50 --seed 42"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Select samples from a pool directory and store the selection.
    Select(SelectArgs),

    /// Print the stored selection for a dataset.
    Show(ShowArgs),

    /// Print the selection task descriptor as JSON.
    Describe,
}

/// Arguments for `label-forge select`.
#[derive(Parser, Debug)]
pub struct SelectArgs {
    /// Experiment whose model scores the pool.
    #[arg(short = 'e', long)]
    pub experiment: String,

    /// Directory of preprocessed pool samples.
    #[arg(short = 'p', long)]
    pub pool: PathBuf,

    /// Dataset name the selection is stored under.
    #[arg(short = 'd', long)]
    pub dataset: String,

    /// Number of samples to select (default: 100).
    #[arg(short = 'n', long)]
    pub query_size: Option<usize>,

    /// Inference batch size (default: 32).
    #[arg(short = 'b', long)]
    pub batch_size: Option<usize>,

    /// Seed for the selection draw.
    #[arg(short = 's', long)]
    pub seed: Option<u64>,

    /// Factor applied to every loaded input value (e.g. 0.00392156862 for raw pixels).
    #[arg(long)]
    pub input_scale: Option<f32>,

    /// Model registry root.
    #[arg(short = 'm', long, env = "LABEL_FORGE_MODEL_ROOT")]
    pub models: Option<PathBuf>,

    /// Selection output root.
    #[arg(short = 'o', long, env = "LABEL_FORGE_OUTPUT_DIR")]
    pub output: Option<PathBuf>,

    /// YAML or JSON configuration file.
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Output JSON instead of a text summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `label-forge show`.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Dataset name the selection is stored under.
    #[arg(short = 'd', long)]
    pub dataset: String,

    /// Selection output root.
    #[arg(short = 'o', long, env = "LABEL_FORGE_OUTPUT_DIR", default_value = "./selections")]
    pub output: PathBuf,

    /// Output JSON instead of a text summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parses command-line arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parses arguments and runs the selected command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Runs the selected command.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Select(args) => run_select(args).await,
        Commands::Show(args) => run_show(args).await,
        Commands::Describe => {
            println!(
                "{}",
                serde_json::to_string_pretty(&TaskDescriptor::active_learning())?
            );
            Ok(())
        }
    }
}

/// Builds the effective configuration: file, then environment, then flags.
fn resolve_config(args: &SelectArgs) -> Result<SelectionConfig, TaskError> {
    let mut config = match &args.config {
        Some(path) => SelectionConfig::from_file(path)?,
        None => SelectionConfig::default(),
    };
    config.apply_env()?;

    if let Some(query_size) = args.query_size {
        config.query_size = query_size;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(scale) = args.input_scale {
        config.input_scale = scale;
    }
    if let Some(models) = &args.models {
        config.model_root = models.clone();
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn select(args: &SelectArgs) -> Result<crate::export::SelectionReport, TaskError> {
    let config = resolve_config(args)?;

    let pool = PoolLoader::new(&args.pool)
        .with_extensions(config.pool_extensions.clone())
        .with_input_scale(config.input_scale)
        .load()?;

    let task = SelectionTask::new(
        config.clone(),
        Arc::new(DirectoryModelRegistry::new(&config.model_root)),
        Arc::new(FsSelectionStore::new(&config.output_dir)),
    );

    let mut request = SelectionRequest::new(&args.experiment, &args.dataset);
    request.query_size = Some(config.query_size);

    let mut ctx = SelectionContext::for_config(&config);
    task.run(&request, &pool, &mut ctx).await
}

async fn run_select(args: SelectArgs) -> anyhow::Result<()> {
    match select(&args).await {
        Ok(report) => {
            if args.json {
                println!("{}", report.to_json()?);
            } else {
                println!(
                    "Selected {} of {} samples for dataset '{}':",
                    report.len(),
                    report.total,
                    args.dataset
                );
                for (rank, (index, name)) in report.entries().enumerate() {
                    println!("  {:>4}. [{}] {}", rank + 1, index, name);
                }
            }
            Ok(())
        }
        Err(err) => {
            let failure = TaskFailure::from(&err);
            error!(kind = %failure.kind, error = %failure.message, "Selection failed");
            if args.json {
                println!("{}", serde_json::to_string_pretty(&failure)?);
            }
            Err(err.into())
        }
    }
}

async fn run_show(args: ShowArgs) -> anyhow::Result<()> {
    let store = FsSelectionStore::new(&args.output);
    let report = store.load(&args.dataset).await?;
    info!(dataset = %args.dataset, selected = report.len(), "Loaded selection");

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        println!(
            "Selection for '{}' ({}): {} of {} samples",
            args.dataset,
            report.timestamp.to_rfc3339(),
            report.len(),
            report.total
        );
        for (rank, (index, name)) in report.entries().enumerate() {
            println!("  {:>4}. [{}] {}", rank + 1, index, name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select() {
        let cli = Cli::try_parse_from([
            "label-forge",
            "select",
            "--experiment",
            "emotion",
            "--pool",
            "./pool",
            "--dataset",
            "faces",
            "-n",
            "25",
            "--seed",
            "7",
            "-j",
        ])
        .unwrap();

        match cli.command {
            Commands::Select(args) => {
                assert_eq!(args.experiment, "emotion");
                assert_eq!(args.query_size, Some(25));
                assert_eq!(args.seed, Some(7));
                assert!(args.json);
            }
            _ => panic!("expected select"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_parse_requires_experiment() {
        assert!(Cli::try_parse_from(["label-forge", "select", "--pool", "p", "--dataset", "d"]).is_err());
    }

    #[test]
    fn test_resolve_config_flags_override_defaults() {
        let args = SelectArgs {
            experiment: "emotion".to_string(),
            pool: PathBuf::from("./pool"),
            dataset: "faces".to_string(),
            query_size: Some(5),
            batch_size: Some(4),
            seed: Some(11),
            input_scale: None,
            models: Some(PathBuf::from("/tmp/models")),
            output: Some(PathBuf::from("/tmp/out")),
            config: None,
            json: false,
        };

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.query_size, 5);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.model_root, PathBuf::from("/tmp/models"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_resolve_config_rejects_zero_query_size() {
        let args = SelectArgs {
            experiment: "emotion".to_string(),
            pool: PathBuf::from("./pool"),
            dataset: "faces".to_string(),
            query_size: Some(0),
            batch_size: None,
            seed: None,
            input_scale: None,
            models: None,
            output: None,
            config: None,
            json: false,
        };

        assert!(matches!(
            resolve_config(&args),
            Err(TaskError::Configuration(_))
        ));
    }

    #[test]
    fn test_resolve_config_flag_fixes_file_value() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("select.yaml");
        std::fs::write(&path, "query_size: 0\nbatch_size: 16\n").unwrap();

        let args = SelectArgs {
            experiment: "emotion".to_string(),
            pool: PathBuf::from("./pool"),
            dataset: "faces".to_string(),
            query_size: Some(5),
            batch_size: None,
            seed: None,
            input_scale: None,
            models: None,
            output: None,
            config: Some(path),
            json: false,
        };

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.query_size, 5);
        assert_eq!(config.batch_size, 16);
    }
}
