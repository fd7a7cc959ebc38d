use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single text generation call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_new_tokens: 500,
            temperature: 0.7,
        }
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Text generation backend
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Provider name, e.g. "huggingface"
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    /// Generate a completion for the prompt and return the generated text
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}
