//! WebPilot AI - inference clients and action planners.
//!
//! The planner turns a task description and target URL into an ordered
//! action plan. It asks an inference backend to classify the task and falls
//! back to deterministic keyword matching whenever the backend is absent,
//! fails, or answers with something that is not JSON.

pub mod config;
pub mod error;
mod http_client;
pub mod llm;
pub mod planner;

pub use config::{InferenceConfig, InferenceProvider, create_inference_client};
pub use error::{AiError, Result};
pub use llm::{GenerationRequest, HuggingFaceClient, InferenceClient, LlmRetryConfig, OpenAIClient};
pub use planner::{ActionPlanner, AiPlanner, KeywordPlanner, Plan};
