//! Inference clients - text generation backends used by the planner

mod client;
mod huggingface;
pub mod mock_client;
mod openai;
mod retry;

pub use client::{GenerationRequest, InferenceClient};
pub use huggingface::{DEFAULT_HF_MODEL, HuggingFaceClient};
pub use openai::OpenAIClient;
pub use retry::LlmRetryConfig;
