use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Outcome of one execution attempt
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct TaskResult {
    pub success: bool,
    /// Structured output (analysis, extracted text keyed by selector)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "Record<string, unknown> | null")]
    pub data: Option<Value>,
    /// Base64-encoded PNG screenshots, in capture order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshots: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock duration of the attempt in milliseconds
    #[ts(type = "number")]
    pub execution_time_ms: i64,
    /// Number of plan actions that ran successfully
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions_completed: Option<u32>,
}

impl TaskResult {
    pub fn failure(error: impl Into<String>, execution_time_ms: i64) -> Self {
        Self {
            success: false,
            data: None,
            screenshots: None,
            error: Some(error.into()),
            execution_time_ms,
            actions_completed: None,
        }
    }
}
