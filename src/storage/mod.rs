//! Persistent storage for selection artifacts.
//!
//! Selection runs hand their finished report to a [`SelectionStore`]; the
//! store is the only component that touches durable storage, and it is called
//! once per successful run.
//!
//! # Usage
//!
//! ```rust,ignore
//! use label_forge::storage::{FsSelectionStore, SelectionStore};
//!
//! let store = FsSelectionStore::new("./selections");
//! let path = store.save("faces-2026-10", &report).await?;
//! let latest = store.load("faces-2026-10").await?;
//! ```

pub mod selection;

pub use selection::{validate_dataset_name, FsSelectionStore, SelectionStore, StorageError};
