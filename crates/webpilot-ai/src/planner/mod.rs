//! Action planners.
//!
//! A planner maps a task description and target URL to a [`Plan`]: the
//! task's classification plus an ordered action list. Planning never fails;
//! every backend problem degrades to the keyword classification.

mod actions;
mod ai;
mod analysis;
mod keyword;
mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use webpilot_models::{PlannedAction, TaskAnalysis};

pub use actions::actions_from_tokens;
pub use ai::AiPlanner;
pub use analysis::{classify_description, fallback_analysis, parse_analysis};
pub use keyword::KeywordPlanner;
pub use prompt::build_analysis_prompt;

/// Planner output for one task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub analysis: TaskAnalysis,
    pub actions: Vec<PlannedAction>,
}

#[async_trait]
pub trait ActionPlanner: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn plan(&self, description: &str, url: &str) -> Plan;
}
