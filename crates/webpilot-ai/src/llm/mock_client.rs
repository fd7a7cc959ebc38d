//! Deterministic mock inference client for planner and controller tests.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

use crate::error::{AiError, Result};
use crate::llm::client::{GenerationRequest, InferenceClient};

/// Scripted response kind.
#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Return generated text.
    Text(String),
    /// Return an inference error.
    Error(String),
}

/// Scripted generation step with optional delay.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub delay_ms: u64,
    pub kind: MockStepKind,
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Text(content.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Error(message.into()),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// Inference client replaying scripted steps in order.
pub struct MockInferenceClient {
    steps: Mutex<VecDeque<MockStep>>,
    prompts: Mutex<Vec<String>>,
}

impl MockInferenceClient {
    pub fn new(steps: Vec<MockStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.prompts.lock().await.push(request.prompt);

        let step = self.steps.lock().await.pop_front();
        let Some(step) = step else {
            return Err(AiError::Llm("mock script exhausted".to_string()));
        };

        if step.delay_ms > 0 {
            sleep(Duration::from_millis(step.delay_ms)).await;
        }

        match step.kind {
            MockStepKind::Text(text) => Ok(text),
            MockStepKind::Error(message) => Err(AiError::Llm(message)),
        }
    }
}
