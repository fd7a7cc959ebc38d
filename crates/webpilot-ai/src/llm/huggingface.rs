//! Hugging Face Inference API text generation client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::{GenerationRequest, InferenceClient};
use crate::llm::retry::{LlmRetryConfig, send_with_retry};

pub const DEFAULT_HF_BASE_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_HF_MODEL: &str = "microsoft/DialoGPT-medium";

/// Hugging Face text generation client
pub struct HuggingFaceClient {
    client: Client,
    api_token: String,
    model: String,
    base_url: String,
    retry_config: LlmRetryConfig,
}

impl HuggingFaceClient {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            client: build_http_client(Duration::from_secs(60)),
            api_token: api_token.into(),
            model: DEFAULT_HF_MODEL.to_string(),
            base_url: DEFAULT_HF_BASE_URL.to_string(),
            retry_config: LlmRetryConfig::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (self-hosted inference endpoints)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_config(mut self, config: LlmRetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_http_client(timeout);
        self
    }
}

#[derive(Serialize)]
struct HfRequest<'a> {
    inputs: &'a str,
    parameters: HfParameters,
}

#[derive(Serialize)]
struct HfParameters {
    max_new_tokens: u32,
    temperature: f32,
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct HfGenerated {
    generated_text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HfResponse {
    Many(Vec<HfGenerated>),
    One(HfGenerated),
}

#[async_trait]
impl InferenceClient for HuggingFaceClient {
    fn provider(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let body = HfRequest {
            inputs: &request.prompt,
            parameters: HfParameters {
                max_new_tokens: request.max_new_tokens,
                temperature: request.temperature,
                do_sample: true,
                return_full_text: false,
            },
        };
        let url = format!("{}/models/{}", self.base_url, self.model);

        let response = send_with_retry(&self.retry_config, "HuggingFace", || {
            self.client
                .post(&url)
                .bearer_auth(&self.api_token)
                .json(&body)
        })
        .await?;

        let generated = match response.json::<HfResponse>().await? {
            HfResponse::Many(items) => items.into_iter().next(),
            HfResponse::One(item) => Some(item),
        };

        generated
            .map(|item| item.generated_text)
            .ok_or_else(|| AiError::InvalidFormat("empty generation from HuggingFace".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retries() -> LlmRetryConfig {
        LlmRetryConfig {
            max_retries: 2,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn generates_text_from_array_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/acme/planner"))
            .and(header("authorization", "Bearer hf_test"))
            .and(body_partial_json(json!({
                "inputs": "classify this",
                "parameters": {"max_new_tokens": 500, "do_sample": true}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"generated_text": "{\"task_type\":\"search\"}"}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new("hf_test")
            .with_model("acme/planner")
            .with_base_url(server.uri());

        let text = client
            .generate(GenerationRequest::new("classify this"))
            .await
            .unwrap();
        assert_eq!(text, "{\"task_type\":\"search\"}");
    }

    #[tokio::test]
    async fn retries_while_model_is_loading() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/acme/planner"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({"error": "Model is currently loading"})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/acme/planner"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"generated_text": "ok"})))
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new("hf_test")
            .with_model("acme/planner")
            .with_base_url(server.uri())
            .with_retry_config(fast_retries());

        let text = client.generate(GenerationRequest::new("hi")).await.unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid credentials"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new("bad")
            .with_base_url(server.uri())
            .with_retry_config(fast_retries());

        let error = client.generate(GenerationRequest::new("hi")).await.unwrap_err();
        match error {
            AiError::LlmHttp { status, message, .. } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid credentials");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_array_is_invalid_format() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = HuggingFaceClient::new("hf_test").with_base_url(server.uri());
        let error = client.generate(GenerationRequest::new("hi")).await.unwrap_err();
        assert!(matches!(error, AiError::InvalidFormat(_)));
    }
}
