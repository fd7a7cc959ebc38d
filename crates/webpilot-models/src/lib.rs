//! Shared data model for WebPilot.
//!
//! Every crate in the workspace speaks these types: the storage layer
//! persists them as JSON, the planner produces [`PlannedAction`]s, the
//! executor turns them into a [`TaskResult`], and the HTTP layer serializes
//! them unchanged.

pub mod action;
pub mod analysis;
pub mod event;
pub mod result;
pub mod task;

pub use action::{ActionType, BrowserAction, PlannedAction};
pub use analysis::TaskAnalysis;
pub use event::{TaskEvent, TaskEventType};
pub use result::TaskResult;
pub use task::{BrowserTask, NewTask, TaskPatch, TaskStatus};

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
