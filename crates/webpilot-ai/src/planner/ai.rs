use async_trait::async_trait;
use std::sync::Arc;
use webpilot_models::TaskAnalysis;

use super::actions::actions_from_tokens;
use super::analysis::{fallback_analysis, parse_analysis};
use super::prompt::build_analysis_prompt;
use super::{ActionPlanner, Plan};
use crate::config::InferenceConfig;
use crate::llm::{GenerationRequest, InferenceClient};

/// Plans by asking an inference backend to classify the task.
pub struct AiPlanner {
    client: Option<Arc<dyn InferenceClient>>,
    max_new_tokens: u32,
    temperature: f32,
}

impl AiPlanner {
    pub fn new(client: Option<Arc<dyn InferenceClient>>) -> Self {
        let defaults = InferenceConfig::default();
        Self {
            client,
            max_new_tokens: defaults.max_new_tokens,
            temperature: defaults.temperature,
        }
    }

    /// Planner with no backend; always uses the keyword classification
    pub fn offline() -> Self {
        Self::new(None)
    }

    pub fn from_config(client: Option<Arc<dyn InferenceClient>>, config: &InferenceConfig) -> Self {
        Self {
            client,
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
        }
    }

    /// Classify the task, falling back to keywords on any backend problem.
    pub async fn analyze(&self, description: &str, url: &str) -> TaskAnalysis {
        let Some(client) = &self.client else {
            tracing::debug!("No inference backend, using keyword analysis");
            return fallback_analysis(description);
        };

        let request = GenerationRequest::new(build_analysis_prompt(description, url))
            .with_max_new_tokens(self.max_new_tokens)
            .with_temperature(self.temperature);

        match client.generate(request).await {
            Ok(text) => match parse_analysis(&text) {
                Some(analysis) => analysis,
                None => {
                    tracing::warn!(
                        provider = client.provider(),
                        response_len = text.len(),
                        "Inference response was not a JSON object, using keyword analysis"
                    );
                    fallback_analysis(description)
                }
            },
            Err(error) => {
                tracing::warn!(
                    provider = client.provider(),
                    error = %error,
                    "Inference call failed, using keyword analysis"
                );
                fallback_analysis(description)
            }
        }
    }
}

#[async_trait]
impl ActionPlanner for AiPlanner {
    fn name(&self) -> &str {
        "ai"
    }

    async fn plan(&self, description: &str, url: &str) -> Plan {
        let analysis = self.analyze(description, url).await;
        let actions = actions_from_tokens(&analysis.required_actions, url);
        Plan { analysis, actions }
    }
}
