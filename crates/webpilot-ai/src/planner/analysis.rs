use serde_json::{Map, Value};
use webpilot_models::TaskAnalysis;

const SEARCH_KEYWORDS: &[&str] = &["search", "find", "look"];
const FORM_KEYWORDS: &[&str] = &["form", "fill", "submit"];
const EXTRACT_KEYWORDS: &[&str] = &["extract", "scrape", "collect"];

const DEFAULT_COMPLEXITY: &str = "Medium";
const DEFAULT_ESTIMATED_TIME: u32 = 30;
const DEFAULT_SUCCESS_CRITERIA: &str = "Task completed without errors";

/// Keyword classification of a description. First matching group wins.
pub fn classify_description(description: &str) -> &'static str {
    let description = description.to_lowercase();
    let matches_any = |keywords: &[&str]| keywords.iter().any(|k| description.contains(k));

    if matches_any(SEARCH_KEYWORDS) {
        TaskAnalysis::SEARCH
    } else if matches_any(FORM_KEYWORDS) {
        TaskAnalysis::FORM_FILL
    } else if matches_any(EXTRACT_KEYWORDS) {
        TaskAnalysis::DATA_EXTRACT
    } else {
        TaskAnalysis::GENERAL
    }
}

/// Deterministic analysis used whenever the backend cannot be used.
pub fn fallback_analysis(description: &str) -> TaskAnalysis {
    TaskAnalysis {
        task_type: classify_description(description).to_string(),
        complexity: DEFAULT_COMPLEXITY.to_string(),
        estimated_time: DEFAULT_ESTIMATED_TIME,
        required_actions: vec!["navigate".to_string(), "screenshot".to_string()],
        success_criteria: DEFAULT_SUCCESS_CRITERIA.to_string(),
    }
}

/// Parse backend output into an analysis.
///
/// The whole text is tried as JSON first, then the span from the first `{`
/// to the last `}`. Only a JSON object is accepted; missing or mistyped
/// fields take defaults, and a missing `required_actions` means no actions.
pub fn parse_analysis(text: &str) -> Option<TaskAnalysis> {
    let object = parse_object(text.trim()).or_else(|| {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end <= start {
            return None;
        }
        parse_object(&text[start..=end])
    })?;

    Some(TaskAnalysis {
        task_type: string_field(&object, "task_type")
            .unwrap_or_else(|| TaskAnalysis::GENERAL.to_string()),
        complexity: string_field(&object, "complexity")
            .unwrap_or_else(|| DEFAULT_COMPLEXITY.to_string()),
        estimated_time: estimated_time(object.get("estimated_time")),
        required_actions: object
            .get("required_actions")
            .and_then(Value::as_array)
            .map(|tokens| {
                tokens
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        success_criteria: string_field(&object, "success_criteria")
            .unwrap_or_else(|| DEFAULT_SUCCESS_CRITERIA.to_string()),
    })
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(object) => Some(object),
        _ => None,
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn estimated_time(value: Option<&Value>) -> u32 {
    let seconds = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text
            .split_whitespace()
            .next()
            .and_then(|first| first.parse::<f64>().ok()),
        _ => None,
    };

    seconds
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| s.round().min(u32::MAX as f64) as u32)
        .unwrap_or(DEFAULT_ESTIMATED_TIME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_precedence() {
        assert_eq!(classify_description("Search for flights"), "search");
        assert_eq!(classify_description("find the cheapest"), "search");
        assert_eq!(classify_description("fill the signup form"), "form_fill");
        assert_eq!(classify_description("extract data from page"), "data_extract");
        assert_eq!(classify_description("scrape prices"), "data_extract");
        assert_eq!(classify_description("open the homepage"), "general");
        // search keywords take precedence over form keywords
        assert_eq!(classify_description("submit a search"), "search");
    }

    #[test]
    fn test_fallback_analysis() {
        let analysis = fallback_analysis("extract data from page");
        assert_eq!(analysis.task_type, "data_extract");
        assert_eq!(analysis.complexity, "Medium");
        assert_eq!(analysis.estimated_time, 30);
        assert_eq!(analysis.required_actions, vec!["navigate", "screenshot"]);
        assert_eq!(analysis.success_criteria, "Task completed without errors");
    }

    #[test]
    fn test_parse_plain_json() {
        let analysis = parse_analysis(
            r#"{"task_type":"search","complexity":"Low","estimated_time":12,
                "required_actions":["navigate","type","click"],"success_criteria":"results shown"}"#,
        )
        .unwrap();
        assert_eq!(analysis.task_type, "search");
        assert_eq!(analysis.complexity, "Low");
        assert_eq!(analysis.estimated_time, 12);
        assert_eq!(analysis.required_actions, vec!["navigate", "type", "click"]);
    }

    #[test]
    fn test_parse_json_embedded_in_prose() {
        let text = "Sure! Here is the analysis:\n{\"task_type\": \"form_fill\", \"estimated_time\": \"45 seconds\"}\nGood luck.";
        let analysis = parse_analysis(text).unwrap();
        assert_eq!(analysis.task_type, "form_fill");
        assert_eq!(analysis.estimated_time, 45);
        assert_eq!(analysis.complexity, "Medium");
        assert!(analysis.required_actions.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(parse_analysis("I cannot help with that").is_none());
        assert!(parse_analysis("[1, 2, 3]").is_none());
        assert!(parse_analysis("} backwards {").is_none());
        assert!(parse_analysis("").is_none());
    }

    #[test]
    fn test_non_string_actions_are_skipped() {
        let analysis =
            parse_analysis(r#"{"required_actions":["navigate", 7, null, "screenshot"]}"#).unwrap();
        assert_eq!(analysis.required_actions, vec!["navigate", "screenshot"]);
    }
}
