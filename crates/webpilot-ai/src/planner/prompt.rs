/// Prompt asking the backend to classify a browser automation task as JSON.
pub fn build_analysis_prompt(description: &str, url: &str) -> String {
    format!(
        r#"Analyze this web automation task and provide a structured response:

Task: {description}
Target URL: {url}

Respond with a single JSON object containing:
- task_type: one of "search", "form_fill", "data_extract", "general"
- complexity: "Low", "Medium" or "High"
- estimated_time: estimated duration in seconds
- required_actions: ordered list of actions from "navigate", "click", "type", "screenshot"
- success_criteria: how to tell the task succeeded

Response:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_task() {
        let prompt = build_analysis_prompt("search for flights to Tokyo", "https://example.com");
        assert!(prompt.contains("Task: search for flights to Tokyo"));
        assert!(prompt.contains("Target URL: https://example.com"));
        assert!(prompt.contains("required_actions"));
    }
}
