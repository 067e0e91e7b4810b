//! Inference client abstraction.
//!
//! The dispatcher only needs "send this chat request to that model". The
//! `InferenceClient` trait hides which hosted backend answers it.

mod github;

pub use github::GitHubModelsClient;

use std::time::Duration;

use async_trait::async_trait;
use models_compare_common::{ChatCompletionRequest, ChatCompletionResponse};

/// Why a single model call failed. Becomes that model's error outcome.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Missing access token")]
    MissingCredential,

    #[error("Backend communication error: {0}")]
    Communication(String),

    #[error("Backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// A hosted chat completion backend.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Whether the client holds the credentials it needs to make calls.
    ///
    /// Checked once per comparison, before any network traffic.
    fn has_credentials(&self) -> bool {
        true
    }

    /// Run one chat completion against `model_id`.
    async fn complete(
        &self,
        model_id: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, InferenceError>;
}
