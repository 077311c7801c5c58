//! Command-line interface for label-forge.
//!
//! Provides commands for running a selection, inspecting stored selections,
//! and describing the selection task.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
