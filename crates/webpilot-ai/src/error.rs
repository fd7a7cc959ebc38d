//! Error types for the AI module

use thiserror::Error;

/// AI module error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Inference error: {0}")]
    Llm(String),

    #[error("{provider} request failed with status {status}: {message}")]
    LlmHttp {
        provider: String,
        status: u16,
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AiError {
    /// Rate limits, server errors, timeouts and dropped connections are worth
    /// another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::LlmHttp { status, .. } => *status == 429 || *status >= 500,
            AiError::Http(error) => error.is_timeout() || error.is_connect(),
            AiError::Llm(message) => {
                let message = message.to_ascii_lowercase();
                message.contains("rate limit")
                    || message.contains("timeout")
                    || message.contains("overloaded")
            }
            AiError::InvalidFormat(_) | AiError::Json(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            AiError::LlmHttp {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Result type alias for AI operations
pub type Result<T> = std::result::Result<T, AiError>;
