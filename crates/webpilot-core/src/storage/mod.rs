//! Storage layer with typed wrappers around webpilot-storage.
//!
//! This module provides type-safe access to the storage layer by wrapping
//! the byte-level APIs from webpilot-storage with the shared models.

pub mod browser_task;

use anyhow::Result;
use std::path::Path;

pub use browser_task::BrowserTaskStorage;

/// Central storage manager that initializes all storage subsystems.
pub struct Storage {
    pub tasks: BrowserTaskStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let inner = webpilot_storage::Storage::new(path)?;
        Ok(Self {
            tasks: BrowserTaskStorage::new(inner.tasks),
        })
    }
}
