//! WebPilot Storage - Low-level storage layer
//!
//! Persists browser tasks, their actions and their event log in a redb
//! embedded database. The API is byte-level; typed wrappers that serialize
//! the shared models live in `webpilot-core`.
//!
//! # Tables
//!
//! - `browser_tasks` - Task records
//! - `browser_task_created_index` / `browser_task_index_keys` - Creation-time ordering
//! - `task_actions` / `task_action_index` - Executed plan steps per task
//! - `task_events` / `task_event_index` - Event log per task

pub mod browser_task;
pub mod range_utils;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use browser_task::{BrowserTaskStorage, RawAction};

/// Central storage manager that opens the database and its tables
pub struct Storage {
    pub tasks: BrowserTaskStorage,
}

impl Storage {
    /// Open (or create) the database at `path` and initialize all tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = Arc::new(Database::create(path)?);
        let tasks = BrowserTaskStorage::new(db)?;
        tracing::debug!(path = %path.display(), "storage opened");

        Ok(Self { tasks })
    }
}
