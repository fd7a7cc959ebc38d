//! Browser task model.
//!
//! A browser task is a description of an automation goal against a target
//! URL, together with its lifecycle status and the result of the most recent
//! execution attempt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::action::BrowserAction;
use crate::now_ms;
use crate::result::TaskResult;

/// Lifecycle status of a browser task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash, Default)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created and waiting for an execute request
    #[default]
    Pending,
    /// An execution attempt is in flight
    Running,
    /// The last execution attempt succeeded
    Completed,
    /// The last execution attempt failed
    Failed,
    /// Cancelled by an explicit update
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and failed are the only statuses an execution writes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A browser automation task
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct BrowserTask {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Display name
    pub name: String,
    /// Natural-language description of the goal
    pub description: String,
    /// Target URL the execution starts from
    pub url: String,
    /// Current lifecycle status
    #[serde(default)]
    pub status: TaskStatus,
    /// Creation time (milliseconds since epoch)
    #[ts(type = "number")]
    pub created_at: i64,
    /// Last modification time (milliseconds since epoch)
    #[ts(type = "number")]
    pub updated_at: i64,
    /// Time the last execution attempt finished (milliseconds since epoch)
    #[serde(default)]
    #[ts(type = "number | null")]
    pub completed_at: Option<i64>,
    /// Result of the last execution attempt
    #[serde(default)]
    pub result: Option<TaskResult>,
    /// Actions of the last execution attempt, in execution order
    #[serde(default)]
    pub actions: Vec<BrowserAction>,
    /// Number of execution attempts started; identifies the latest one
    #[serde(default)]
    pub attempt: u32,
}

impl BrowserTask {
    /// Create a new pending task with a fresh id
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        let now = now_ms();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            url: url.into(),
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            result: None,
            actions: Vec::new(),
            attempt: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running
    }

    /// Mark the task as running under a new attempt number
    pub fn set_running(&mut self) {
        self.status = TaskStatus::Running;
        self.attempt = self.attempt.wrapping_add(1);
        self.updated_at = now_ms();
    }

    /// Record the outcome of an execution attempt.
    ///
    /// Sets `completed` or `failed` from `result.success`, unless the task
    /// was cancelled while the attempt was in flight, in which case the
    /// cancellation is kept and only the result is recorded.
    pub fn finish(&mut self, result: TaskResult) {
        let now = now_ms();
        if self.status != TaskStatus::Cancelled {
            self.status = if result.success {
                TaskStatus::Completed
            } else {
                TaskStatus::Failed
            };
        }
        self.result = Some(result);
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Apply the descriptive fields of a patch. Status is handled by the
    /// lifecycle controller.
    pub fn apply_fields(&mut self, patch: &TaskPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(url) = &patch.url {
            self.url = url.clone();
        }
        self.updated_at = now_ms();
    }
}

/// Fields required to create a task
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct NewTask {
    pub name: String,
    pub description: String,
    pub url: String,
}

/// Partial update of a task; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct TaskPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.url.is_none()
            && self.status.is_none()
    }
}
