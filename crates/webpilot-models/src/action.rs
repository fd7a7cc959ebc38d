//! Browser actions.
//!
//! The planner produces [`PlannedAction`]s; once a plan has been executed for
//! a task, each step is recorded as a [`BrowserAction`] owned by that task.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::now_ms;

/// Kind of a single browser operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Navigate,
    Click,
    Type,
    Scroll,
    Wait,
    Extract,
    Screenshot,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Navigate => "navigate",
            ActionType::Click => "click",
            ActionType::Type => "type",
            ActionType::Scroll => "scroll",
            ActionType::Wait => "wait",
            ActionType::Extract => "extract",
            ActionType::Screenshot => "screenshot",
        }
    }

    /// Parse a plan token such as `"click"`. Unknown tokens yield `None`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "navigate" => Some(ActionType::Navigate),
            "click" => Some(ActionType::Click),
            "type" => Some(ActionType::Type),
            "scroll" => Some(ActionType::Scroll),
            "wait" => Some(ActionType::Wait),
            "extract" => Some(ActionType::Extract),
            "screenshot" => Some(ActionType::Screenshot),
            _ => None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a plan, before it is bound to a task
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct PlannedAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    pub description: String,
    /// Execution sequence. Not required to be unique or contiguous.
    pub order: i32,
}

impl PlannedAction {
    pub fn new(action_type: ActionType, description: impl Into<String>, order: i32) -> Self {
        Self {
            action_type,
            selector: None,
            value: None,
            description: description.into(),
            order,
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Stable sort by `order`; equal orders keep plan position.
    pub fn sort_by_order(actions: &mut [PlannedAction]) {
        actions.sort_by_key(|action| action.order);
    }
}

/// A persisted action belonging to exactly one task
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct BrowserAction {
    pub id: String,
    /// Owning task
    pub task_id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    pub description: String,
    /// Whether the action ran successfully
    #[serde(default)]
    pub completed: bool,
    pub order: i32,
    #[ts(type = "number")]
    pub created_at: i64,
}

impl BrowserAction {
    /// Bind a planned action to a task
    pub fn from_planned(task_id: impl Into<String>, planned: &PlannedAction) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            task_id: task_id.into(),
            action_type: planned.action_type,
            selector: planned.selector.clone(),
            value: planned.value.clone(),
            description: planned.description.clone(),
            completed: false,
            order: planned.order,
            created_at: now_ms(),
        }
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}
