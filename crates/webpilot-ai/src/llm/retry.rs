use std::time::Duration;

use reqwest::{RequestBuilder, Response};

use crate::error::{AiError, Result};

#[derive(Debug, Clone)]
pub struct LlmRetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for LlmRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl LlmRetryConfig {
    /// No retries at all
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn delay_for(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        if let Some(seconds) = retry_after_secs {
            return Duration::from_secs(seconds);
        }

        let multiplier = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        let delay = (self.initial_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

pub fn parse_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
}

pub async fn response_to_error(response: Response, provider: &str) -> AiError {
    let status = response.status().as_u16();
    let retry_after = parse_retry_after(&response);
    let body = response.text().await.unwrap_or_default();

    // Keep provider error bodies short in logs and results
    const MAX_ERROR_BODY: usize = 512;
    let message = if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &body[..end])
    } else {
        body
    };

    AiError::LlmHttp {
        provider: provider.to_string(),
        status,
        message,
        retry_after_secs: retry_after,
    }
}

/// Send a request, retrying retryable failures with backoff.
///
/// `build` is called once per attempt. Returns the first successful
/// response.
pub async fn send_with_retry<F>(config: &LlmRetryConfig, provider: &str, build: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        let error = match build().send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => response_to_error(response, provider).await,
            Err(error) => AiError::Http(error),
        };

        if !error.is_retryable() || attempt == config.max_retries {
            return Err(error);
        }

        let delay = config.delay_for(attempt + 1, error.retry_after());
        tracing::warn!(
            provider,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying inference request"
        );
        tokio::time::sleep(delay).await;
        last_error = Some(error);
    }

    Err(last_error.unwrap_or_else(|| AiError::Llm(format!("{provider} request failed after retries"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_progression() {
        let config = LlmRetryConfig::default();
        assert_eq!(config.delay_for(1, None), Duration::from_millis(200));
        assert_eq!(config.delay_for(2, None), Duration::from_millis(400));
        assert_eq!(config.delay_for(3, None), Duration::from_millis(800));
        assert_eq!(config.delay_for(6, None), Duration::from_millis(5000));
    }

    #[test]
    fn test_retry_after_overrides_backoff() {
        let config = LlmRetryConfig::default();
        assert_eq!(config.delay_for(3, Some(10)), Duration::from_secs(10));
    }

    #[test]
    fn test_ai_error_is_retryable() {
        let loading = AiError::LlmHttp {
            provider: "huggingface".to_string(),
            status: 503,
            message: "Model is currently loading".to_string(),
            retry_after_secs: None,
        };
        let unauthorized = AiError::LlmHttp {
            provider: "huggingface".to_string(),
            status: 401,
            message: "Invalid credentials".to_string(),
            retry_after_secs: None,
        };
        assert!(loading.is_retryable());
        assert!(!unauthorized.is_retryable());
        assert!(AiError::Llm("rate limit exceeded".to_string()).is_retryable());
        assert!(!AiError::InvalidFormat("empty".to_string()).is_retryable());
    }
}
