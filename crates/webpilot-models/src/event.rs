//! Task event log entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::now_ms;

/// Record of a task lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct TaskEvent {
    /// Unique event ID
    pub id: String,
    /// Task ID this event belongs to
    pub task_id: String,
    pub event_type: TaskEventType,
    /// Timestamp of the event (milliseconds since epoch)
    #[ts(type = "number")]
    pub timestamp: i64,
    #[serde(default)]
    pub message: Option<String>,
    /// Structured details (status, result summary, action)
    #[serde(default)]
    #[ts(type = "unknown")]
    pub data: Option<Value>,
    /// Duration of execution in milliseconds (for terminal events)
    #[serde(default)]
    #[ts(type = "number | null")]
    pub duration_ms: Option<i64>,
}

/// Type of task event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventType {
    Created,
    Updated,
    Started,
    Completed,
    Failed,
    Cancelled,
    ActionCompleted,
    ActionFailed,
}

impl TaskEvent {
    pub fn new(task_id: impl Into<String>, event_type: TaskEventType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            event_type,
            timestamp: now_ms(),
            message: None,
            data: None,
            duration_ms: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_duration(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = TaskEvent::new("task-1", TaskEventType::ActionFailed)
            .with_message("click timed out")
            .with_duration(5000);
        assert_eq!(event.task_id, "task-1");
        assert_eq!(event.message.as_deref(), Some("click timed out"));
        assert_eq!(event.duration_ms, Some(5000));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "action_failed");
    }
}
