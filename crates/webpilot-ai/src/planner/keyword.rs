use async_trait::async_trait;
use webpilot_models::{ActionType, PlannedAction};

use super::analysis::fallback_analysis;
use super::{ActionPlanner, Plan};

pub const SEARCH_INPUT_SELECTOR: &str = "input[type='search'], input[name='q'], #search";
pub const SUBMIT_SELECTOR: &str = "button[type='submit'], input[type='submit']";
pub const SEARCH_QUERY: &str = "search query from description";

/// Keyword-driven planner that never calls a backend.
///
/// A description mentioning "search" gets a search-box interaction; one
/// mentioning "screenshot" gets a capture step. Anything else yields an
/// empty plan.
#[derive(Debug, Default, Clone)]
pub struct KeywordPlanner;

impl KeywordPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn actions_for(description: &str) -> Vec<PlannedAction> {
        let description = description.to_lowercase();
        let mut actions = Vec::new();

        if description.contains("search") {
            actions.push(
                PlannedAction::new(ActionType::Click, "Click search input", 1)
                    .with_selector(SEARCH_INPUT_SELECTOR),
            );
            actions.push(
                PlannedAction::new(ActionType::Type, "Type search query", 2)
                    .with_selector(SEARCH_INPUT_SELECTOR)
                    .with_value(SEARCH_QUERY),
            );
            actions.push(
                PlannedAction::new(ActionType::Click, "Click search button", 3)
                    .with_selector(SUBMIT_SELECTOR),
            );
        }

        if description.contains("screenshot") {
            let order = i32::try_from(actions.len() + 1).unwrap_or(i32::MAX);
            actions.push(PlannedAction::new(ActionType::Screenshot, "Take screenshot", order));
        }

        actions
    }
}

#[async_trait]
impl ActionPlanner for KeywordPlanner {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn plan(&self, description: &str, _url: &str) -> Plan {
        Plan {
            analysis: fallback_analysis(description),
            actions: Self::actions_for(description),
        }
    }
}
