//! Inference backend selection.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::llm::{DEFAULT_HF_MODEL, HuggingFaceClient, InferenceClient, OpenAIClient};

/// Which text generation backend the planner calls
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InferenceProvider {
    #[default]
    HuggingFace,
    OpenAI,
    /// Never call a backend; always plan by keywords
    Disabled,
}

/// Inference backend settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceConfig {
    #[serde(default)]
    pub provider: InferenceProvider,
    /// API token; no backend is used while this is unset
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Override the provider's public endpoint
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_HF_MODEL.to_string()
}

fn default_max_new_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: InferenceProvider::default(),
            api_token: None,
            model: default_model(),
            base_url: None,
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl InferenceConfig {
    /// Whether a backend will actually be called
    pub fn is_enabled(&self) -> bool {
        self.provider != InferenceProvider::Disabled
            && self
                .api_token
                .as_deref()
                .is_some_and(|token| !token.trim().is_empty())
    }
}

/// Build the configured client, or `None` when inference is disabled or no
/// token is set.
pub fn create_inference_client(config: &InferenceConfig) -> Option<Arc<dyn InferenceClient>> {
    if !config.is_enabled() {
        tracing::info!("Inference backend disabled, planning by keywords");
        return None;
    }
    let token = config.api_token.clone().unwrap_or_default();
    let timeout = Duration::from_secs(config.timeout_secs);

    let client: Arc<dyn InferenceClient> = match config.provider {
        InferenceProvider::HuggingFace => {
            let mut client = HuggingFaceClient::new(token)
                .with_model(&config.model)
                .with_timeout(timeout);
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
        InferenceProvider::OpenAI => {
            let mut client = OpenAIClient::new(token)
                .with_model(&config.model)
                .with_timeout(timeout);
            if let Some(url) = &config.base_url {
                client = client.with_base_url(url);
            }
            Arc::new(client)
        }
        InferenceProvider::Disabled => return None,
    };

    tracing::info!(
        provider = client.provider(),
        model = client.model(),
        "Inference backend configured"
    );
    Some(client)
}
