use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Planner's classification of a task description
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct TaskAnalysis {
    /// `search`, `form_fill`, `data_extract`, `general`, or a label supplied
    /// by the inference backend
    pub task_type: String,
    pub complexity: String,
    /// Estimated duration in seconds
    pub estimated_time: u32,
    /// Ordered action-kind tokens such as `navigate` or `click`
    pub required_actions: Vec<String>,
    pub success_criteria: String,
}

impl TaskAnalysis {
    pub const SEARCH: &'static str = "search";
    pub const FORM_FILL: &'static str = "form_fill";
    pub const DATA_EXTRACT: &'static str = "data_extract";
    pub const GENERAL: &'static str = "general";
}
