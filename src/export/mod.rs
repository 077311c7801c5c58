//! Export module for selection run outputs.
//!
//! Provides the selection report artifact and its JSON schema.

pub mod report;

pub use report::SelectionReport;
