//! Single-prompt fan-out across models.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use models_compare_common::{
    ChatCompletionRequest, ComparisonRequest, ComparisonResponse, ComparisonResult,
    ComparisonSummary, ModelOutcome, ModelResults,
};
use tokio::task::{AbortHandle, JoinHandle};

use super::ProgressSink;
use crate::config::TOKEN_ENV_VAR;
use crate::error::{Error, Result};
use crate::inference::{InferenceClient, InferenceError};
use crate::registry::ModelRegistry;

/// Runs one prompt against several models at once.
pub struct ComparisonDispatcher {
    registry: Arc<ModelRegistry>,
    client: Arc<dyn InferenceClient>,
    call_timeout: Option<Duration>,
}

impl ComparisonDispatcher {
    pub fn new(registry: Arc<ModelRegistry>, client: Arc<dyn InferenceClient>) -> Self {
        Self {
            registry,
            client,
            call_timeout: None,
        }
    }

    /// Bound each model call; a call that runs over becomes that model's error.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Fail with `MissingCredential` if the client cannot authenticate.
    pub fn ensure_credentials(&self) -> Result<()> {
        if self.client.has_credentials() {
            Ok(())
        } else {
            Err(Error::MissingCredential(TOKEN_ENV_VAR))
        }
    }

    /// Compare `request.prompt` across the requested models.
    ///
    /// Unknown model ids are dropped with a warning. If none remain, no
    /// inference is attempted and `NoValidModels` is returned. Otherwise
    /// every model is called concurrently and each call's failure is kept
    /// to that model's outcome.
    ///
    /// Fails only on an invalid request or a missing access token, both
    /// checked before any network call.
    pub async fn compare(
        &self,
        request: &ComparisonRequest,
        progress: &dyn ProgressSink,
    ) -> Result<ComparisonResponse> {
        request.validate()?;
        self.ensure_credentials()?;

        let requested = request.models_or_default();
        let catalog = self.registry.snapshot().await;

        let mut models: Vec<String> = Vec::with_capacity(requested.len());
        for model in &requested {
            if !catalog.contains(model) {
                progress.warn(&format!(
                    "Warning: Model '{}' not found in available models. Skipping.",
                    model
                ));
            } else if !models.contains(model) {
                models.push(model.clone());
            }
        }

        if models.is_empty() {
            tracing::warn!("No valid models among requested {:?}", requested);
            return Ok(ComparisonResponse::NoValidModels {
                error: "No valid models specified".to_string(),
                requested,
                available_models: catalog.ids(),
            });
        }

        let chat_request = request.to_chat_request();
        let total = models.len();

        let calls: Vec<JoinHandle<ModelOutcome>> = models
            .iter()
            .enumerate()
            .map(|(idx, model)| {
                progress.info(&format!("Processing model {}/{}: {}", idx + 1, total, model));
                progress.progress(idx, total);

                let client = Arc::clone(&self.client);
                let model = model.clone();
                let chat_request = chat_request.clone();
                let call_timeout = self.call_timeout;
                tokio::spawn(async move {
                    call_model(client.as_ref(), &model, &chat_request, call_timeout).await
                })
            })
            .collect();
        let _abort = AbortOnDrop(calls.iter().map(JoinHandle::abort_handle).collect());

        let outcomes = join_all(calls).await.into_iter().map(|joined| {
            joined.unwrap_or_else(|e| ModelOutcome::failure(format!("inference task failed: {}", e)))
        });
        let results: ModelResults = models.iter().cloned().zip(outcomes).collect();

        progress.progress(total, total);
        progress.info("Model comparison completed");
        tracing::info!(
            "Compared {} models: {} succeeded, {} failed",
            total,
            results.successes(),
            results.failures()
        );

        Ok(ComparisonResponse::Completed(ComparisonResult {
            results,
            summary: ComparisonSummary {
                models_compared: models,
                prompt: request.prompt.clone(),
                system_message: request.system_message.clone(),
            },
        }))
    }
}

/// Aborts the in-flight model calls if the comparison is dropped before they finish.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

async fn call_model(
    client: &dyn InferenceClient,
    model: &str,
    request: &ChatCompletionRequest,
    call_timeout: Option<Duration>,
) -> ModelOutcome {
    let call = client.complete(model, request);
    let result = match call_timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(InferenceError::Timeout(limit))),
        None => call.await,
    };

    match result {
        Ok(response) => ModelOutcome::from_response(&response),
        Err(e) => {
            tracing::warn!("Model {} failed: {}", model, e);
            ModelOutcome::failure(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::NoProgress;
    use crate::test_util::{
        descriptor, dispatcher_with, registry_over, registry_with, ProgressEvent,
        RecordingProgress, ScriptedCatalogSource, ScriptedInferenceClient,
    };
    use models_compare_common::ModelDescriptor;

    fn catalog() -> Vec<ModelDescriptor> {
        vec![
            descriptor("gpt-4o", "GPT-4o", "OpenAI"),
            descriptor("Mistral-small", "Mistral Small", "Mistral AI"),
            descriptor("Phi-3-mini-128k-instruct", "Phi-3-Mini", "Microsoft"),
            descriptor("Mistral-large", "Mistral Large", "Mistral AI"),
        ]
    }

    fn completed(response: ComparisonResponse) -> ComparisonResult {
        match response {
            ComparisonResponse::Completed(result) => result,
            other => panic!("expected completed comparison, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_model_dropped_with_warning() {
        let client = Arc::new(ScriptedInferenceClient::echo());
        let dispatcher = dispatcher_with(catalog(), client.clone());
        let progress = RecordingProgress::default();

        let request = ComparisonRequest::new("Hello").with_models(["gpt-4o", "not-a-model"]);
        let result = completed(dispatcher.compare(&request, &progress).await.unwrap());

        assert_eq!(result.results.models().collect::<Vec<_>>(), vec!["gpt-4o"]);
        assert_eq!(result.summary.models_compared, vec!["gpt-4o"]);
        let warnings = progress.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("not-a-model"));
        assert_eq!(client.called_models(), vec!["gpt-4o"]);
    }

    #[tokio::test]
    async fn test_failing_model_becomes_error_outcome() {
        let client = Arc::new(ScriptedInferenceClient::echo().fail("gpt-4o", "quota exceeded"));
        let dispatcher = dispatcher_with(catalog(), client);

        let request = ComparisonRequest::new("Hello").with_models(["gpt-4o"]);
        let result = completed(dispatcher.compare(&request, &NoProgress).await.unwrap());

        assert_eq!(result.results.len(), 1);
        let error = result.results.get("gpt-4o").and_then(ModelOutcome::error).unwrap();
        assert!(error.contains("quota exceeded"));

        let json = serde_json::to_value(&result.results).unwrap();
        assert!(json["gpt-4o"]["error"].is_string());
    }

    #[tokio::test]
    async fn test_failure_does_not_taint_siblings() {
        let client = Arc::new(
            ScriptedInferenceClient::echo()
                .fail("Mistral-small", "503 upstream")
                .panic_on("Phi-3-mini-128k-instruct"),
        );
        let dispatcher = dispatcher_with(catalog(), client);

        let request = ComparisonRequest::new("Hello");
        let result = completed(dispatcher.compare(&request, &NoProgress).await.unwrap());

        assert_eq!(
            result.results.models().collect::<Vec<_>>(),
            vec!["gpt-4o", "Mistral-small", "Phi-3-mini-128k-instruct"]
        );
        assert!(result.results.get("gpt-4o").unwrap().is_success());
        assert!(!result.results.get("Mistral-small").unwrap().is_success());
        assert!(!result.results.get("Phi-3-mini-128k-instruct").unwrap().is_success());
    }

    #[tokio::test]
    async fn test_progress_sequence_for_three_models() {
        let client = Arc::new(ScriptedInferenceClient::echo());
        let dispatcher = dispatcher_with(catalog(), client);
        let progress = RecordingProgress::default();

        let request = ComparisonRequest::new("Hello");
        dispatcher.compare(&request, &progress).await.unwrap();

        assert_eq!(progress.steps(), vec![(0, 3), (1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_results_follow_request_order_not_completion_order() {
        let client = Arc::new(
            ScriptedInferenceClient::echo()
                .delay("Mistral-large", Duration::from_millis(60))
                .delay("gpt-4o", Duration::from_millis(30)),
        );
        let dispatcher = dispatcher_with(catalog(), client);

        let request =
            ComparisonRequest::new("Hello").with_models(["Mistral-large", "gpt-4o", "Mistral-small"]);
        let result = completed(dispatcher.compare(&request, &NoProgress).await.unwrap());

        assert_eq!(
            result.results.models().collect::<Vec<_>>(),
            vec!["Mistral-large", "gpt-4o", "Mistral-small"]
        );
    }

    #[tokio::test]
    async fn test_calls_run_concurrently() {
        // each call waits until all three are in flight; sequential calls never get there
        let client = Arc::new(ScriptedInferenceClient::echo().rendezvous(3));
        let dispatcher = dispatcher_with(catalog(), client.clone());

        let request =
            ComparisonRequest::new("Hello").with_models(["gpt-4o", "Mistral-small", "Mistral-large"]);
        let response = tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher.compare(&request, &NoProgress),
        )
        .await
        .expect("calls did not overlap")
        .unwrap();

        let result = completed(response);
        assert_eq!(result.results.successes(), 3);
        assert_eq!(client.finished_models().len(), 3);
    }

    #[tokio::test]
    async fn test_dropping_comparison_aborts_model_calls() {
        let client = Arc::new(
            ScriptedInferenceClient::echo()
                .delay("gpt-4o", Duration::from_millis(200))
                .delay("Mistral-small", Duration::from_millis(200)),
        );
        let dispatcher = dispatcher_with(catalog(), client.clone());

        let request = ComparisonRequest::new("Hello").with_models(["gpt-4o", "Mistral-small"]);
        let cut_short = tokio::time::timeout(
            Duration::from_millis(50),
            dispatcher.compare(&request, &NoProgress),
        )
        .await;
        assert!(cut_short.is_err());
        assert_eq!(client.called_models().len(), 2);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(client.finished_models().is_empty());
    }

    #[tokio::test]
    async fn test_all_invalid_returns_structured_error_without_calls() {
        let client = Arc::new(ScriptedInferenceClient::echo());
        let dispatcher = dispatcher_with(catalog(), client.clone());

        let request = ComparisonRequest::new("Hello").with_models(["nope", "also-nope"]);
        let response = dispatcher.compare(&request, &NoProgress).await.unwrap();

        match response {
            ComparisonResponse::NoValidModels {
                requested,
                available_models,
                ..
            } => {
                assert_eq!(requested, vec!["nope", "also-nope"]);
                assert_eq!(available_models.len(), 4);
            }
            other => panic!("expected NoValidModels, got {:?}", other),
        }
        assert!(client.called_models().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_any_call() {
        let source = Arc::new(ScriptedCatalogSource::ok(catalog()));
        let client = Arc::new(ScriptedInferenceClient::echo().without_credentials());
        let dispatcher =
            ComparisonDispatcher::new(Arc::new(registry_over(source.clone())), client.clone());

        let err = dispatcher
            .compare(&ComparisonRequest::new("Hello"), &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCredential("GITHUB_TOKEN")));
        assert!(dispatcher.ensure_credentials().is_err());
        assert!(client.called_models().is_empty());
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_request_rejected() {
        let client = Arc::new(ScriptedInferenceClient::echo());
        let dispatcher = dispatcher_with(catalog(), client);

        let mut request = ComparisonRequest::new("Hello");
        request.top_p = 1.5;
        let err = dispatcher.compare(&request, &NoProgress).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_parameters_passed_through() {
        let client = Arc::new(ScriptedInferenceClient::echo());
        let dispatcher = dispatcher_with(catalog(), client.clone());

        let mut request = ComparisonRequest::new("Why is the sky blue?")
            .with_system_message("Answer like a pirate.")
            .with_models(["gpt-4o"]);
        request.temperature = 0.2;
        request.top_p = 0.5;
        request.max_tokens = 77;
        let result = completed(dispatcher.compare(&request, &NoProgress).await.unwrap());

        let seen = client.last_request().unwrap();
        assert_eq!(seen.messages[0].content.as_deref(), Some("Answer like a pirate."));
        assert_eq!(seen.messages[1].content.as_deref(), Some("Why is the sky blue?"));
        assert_eq!(seen.temperature, Some(0.2));
        assert_eq!(seen.top_p, Some(0.5));
        assert_eq!(seen.max_tokens, Some(77));
        assert_eq!(result.summary.system_message, "Answer like a pirate.");
        assert_eq!(result.summary.prompt, "Why is the sky blue?");
    }

    #[tokio::test]
    async fn test_duplicate_requested_ids_called_once() {
        let client = Arc::new(ScriptedInferenceClient::echo());
        let dispatcher = dispatcher_with(catalog(), client.clone());

        let request = ComparisonRequest::new("Hello").with_models(["gpt-4o", "gpt-4o"]);
        let result = completed(dispatcher.compare(&request, &NoProgress).await.unwrap());
        assert_eq!(result.results.len(), 1);
        assert_eq!(client.called_models(), vec!["gpt-4o"]);
    }

    #[tokio::test]
    async fn test_call_timeout_becomes_model_error() {
        let client = Arc::new(
            ScriptedInferenceClient::echo().delay("Mistral-large", Duration::from_secs(5)),
        );
        let dispatcher = ComparisonDispatcher::new(Arc::new(registry_with(catalog())), client)
            .with_call_timeout(Some(Duration::from_millis(50)));

        let request = ComparisonRequest::new("Hello").with_models(["gpt-4o", "Mistral-large"]);
        let result = completed(dispatcher.compare(&request, &NoProgress).await.unwrap());

        assert!(result.results.get("gpt-4o").unwrap().is_success());
        let error = result.results.get("Mistral-large").and_then(ModelOutcome::error).unwrap();
        assert!(error.starts_with("Timed out"));
    }

    #[tokio::test]
    async fn test_info_messages_per_model() {
        let client = Arc::new(ScriptedInferenceClient::echo());
        let dispatcher = dispatcher_with(catalog(), client);
        let progress = RecordingProgress::default();

        let request = ComparisonRequest::new("Hello").with_models(["gpt-4o", "Mistral-small"]);
        dispatcher.compare(&request, &progress).await.unwrap();

        let infos: Vec<String> = progress
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Info(msg) => Some(msg),
                _ => None,
            })
            .collect();
        assert_eq!(
            infos,
            vec![
                "Processing model 1/2: gpt-4o",
                "Processing model 2/2: Mistral-small",
                "Model comparison completed",
            ]
        );
    }
}
