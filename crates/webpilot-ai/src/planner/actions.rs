use webpilot_models::{ActionType, PlannedAction};

pub const CLICK_SELECTOR: &str = "button, a, input[type='submit']";
pub const INPUT_SELECTOR: &str = "input, textarea";
pub const GENERATED_INPUT: &str = "Generated input text";

/// Map action tokens to concrete actions.
///
/// Each action's order is the index of its token. Tokens other than
/// `navigate`, `click`, `type` and `screenshot` are dropped, so orders may
/// have gaps.
pub fn actions_from_tokens(tokens: &[String], url: &str) -> Vec<PlannedAction> {
    tokens
        .iter()
        .enumerate()
        .filter_map(|(index, token)| {
            let order = i32::try_from(index).unwrap_or(i32::MAX);
            match ActionType::from_token(token)? {
                ActionType::Navigate => Some(
                    PlannedAction::new(ActionType::Navigate, format!("Navigate to {url}"), order)
                        .with_value(url),
                ),
                ActionType::Click => Some(
                    PlannedAction::new(ActionType::Click, "Click on interactive element", order)
                        .with_selector(CLICK_SELECTOR),
                ),
                ActionType::Type => Some(
                    PlannedAction::new(ActionType::Type, "Type in input field", order)
                        .with_selector(INPUT_SELECTOR)
                        .with_value(GENERATED_INPUT),
                ),
                ActionType::Screenshot => Some(PlannedAction::new(
                    ActionType::Screenshot,
                    "Take screenshot",
                    order,
                )),
                _ => None,
            }
        })
        .collect()
}
