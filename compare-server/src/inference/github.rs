//! GitHub Models inference client (OpenAI-compatible chat completions).

use async_trait::async_trait;
use models_compare_common::{ChatCompletionRequest, ChatCompletionResponse};
use reqwest::Client;

use super::{InferenceClient, InferenceError};

/// Client for the GitHub Models inference endpoint.
pub struct GitHubModelsClient {
    http_client: Client,
    endpoint: String,
    token: Option<String>,
}

impl GitHubModelsClient {
    pub fn new(endpoint: &str, token: Option<String>) -> Self {
        Self {
            http_client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl InferenceClient for GitHubModelsClient {
    fn has_credentials(&self) -> bool {
        self.token.is_some()
    }

    async fn complete(
        &self,
        model_id: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, InferenceError> {
        let token = self
            .token
            .as_deref()
            .ok_or(InferenceError::MissingCredential)?;

        let url = format!("{}/chat/completions", self.endpoint);
        let body = request.for_model(model_id);

        tracing::debug!("Sending chat request: {} model={}", url, model_id);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Communication(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Backend { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))
    }
}
