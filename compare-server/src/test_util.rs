//! Scripted collaborators for exercising the comparison core without network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Barrier;
use models_compare_common::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ModelDescriptor,
};

use crate::catalog::{CatalogCache, CatalogSource, FetchError};
use crate::compare::{ComparisonDispatcher, ProgressSink};
use crate::inference::{InferenceClient, InferenceError};
use crate::registry::ModelRegistry;

pub fn descriptor(id: &str, display_name: &str, publisher: &str) -> ModelDescriptor {
    ModelDescriptor::new(id, display_name, publisher)
}

/// Registry over a catalog that always returns `models`.
pub fn registry_with(models: Vec<ModelDescriptor>) -> ModelRegistry {
    registry_over(Arc::new(ScriptedCatalogSource::ok(models)))
}

/// Registry over `source`, so tests can keep a handle on its fetch count.
pub fn registry_over(source: Arc<ScriptedCatalogSource>) -> ModelRegistry {
    ModelRegistry::new(Arc::new(CatalogCache::new(source, Duration::from_secs(600))))
}

pub fn dispatcher_with(
    models: Vec<ModelDescriptor>,
    client: Arc<ScriptedInferenceClient>,
) -> ComparisonDispatcher {
    ComparisonDispatcher::new(Arc::new(registry_with(models)), client)
}

/// Catalog source with a fixed answer that counts its fetches.
pub struct ScriptedCatalogSource {
    models: Option<Vec<ModelDescriptor>>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl ScriptedCatalogSource {
    pub fn ok(models: Vec<ModelDescriptor>) -> Self {
        Self {
            models: Some(models),
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            models: None,
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for ScriptedCatalogSource {
    async fn fetch(&self) -> Result<Vec<ModelDescriptor>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.models
            .clone()
            .ok_or_else(|| FetchError::Request("connection refused".to_string()))
    }
}

/// Inference client that answers "<model>: <prompt>" unless told otherwise.
pub struct ScriptedInferenceClient {
    failures: HashMap<String, String>,
    panics: HashSet<String>,
    delays: HashMap<String, Duration>,
    credentials: bool,
    rendezvous: Option<Arc<Barrier>>,
    calls: Mutex<Vec<(String, ChatCompletionRequest)>>,
    finished: Mutex<Vec<String>>,
}

impl ScriptedInferenceClient {
    pub fn echo() -> Self {
        Self {
            failures: HashMap::new(),
            panics: HashSet::new(),
            delays: HashMap::new(),
            credentials: true,
            rendezvous: None,
            calls: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(mut self, model: &str, message: &str) -> Self {
        self.failures.insert(model.to_string(), message.to_string());
        self
    }

    pub fn panic_on(mut self, model: &str) -> Self {
        self.panics.insert(model.to_string());
        self
    }

    pub fn delay(mut self, model: &str, delay: Duration) -> Self {
        self.delays.insert(model.to_string(), delay);
        self
    }

    pub fn without_credentials(mut self) -> Self {
        self.credentials = false;
        self
    }

    /// Hold every call until `calls` of them are in flight at once.
    pub fn rendezvous(mut self, calls: usize) -> Self {
        self.rendezvous = Some(Arc::new(Barrier::new(calls)));
        self
    }

    /// Models whose call ran to completion, in completion order.
    pub fn finished_models(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }

    /// Models called so far, in call order.
    pub fn called_models(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(model, _)| model.clone())
            .collect()
    }

    /// User turns received so far, in call order.
    pub fn user_prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, request)| user_turn(request))
            .collect()
    }

    pub fn last_request(&self) -> Option<ChatCompletionRequest> {
        self.calls.lock().unwrap().last().map(|(_, r)| r.clone())
    }
}

fn user_turn(request: &ChatCompletionRequest) -> Option<String> {
    request
        .messages
        .iter()
        .find(|m| m.role == "user")
        .and_then(|m| m.content.clone())
}

#[async_trait]
impl InferenceClient for ScriptedInferenceClient {
    fn has_credentials(&self) -> bool {
        self.credentials
    }

    async fn complete(
        &self,
        model_id: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, InferenceError> {
        self.calls
            .lock()
            .unwrap()
            .push((model_id.to_string(), request.clone()));

        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        if let Some(delay) = self.delays.get(model_id) {
            tokio::time::sleep(*delay).await;
        }
        self.finished.lock().unwrap().push(model_id.to_string());

        if self.panics.contains(model_id) {
            panic!("scripted panic for {}", model_id);
        }
        if let Some(message) = self.failures.get(model_id) {
            return Err(InferenceError::Backend {
                status: 500,
                body: message.clone(),
            });
        }

        let prompt = user_turn(request).unwrap_or_default();
        let reply = ChatMessage::assistant(&format!("{}: {}", model_id, prompt));
        Ok(
            ChatCompletionResponse::new(model_id.to_string(), reply, Some("stop".to_string()))
                .with_usage(10, 5),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Step(usize, usize),
    Info(String),
    Warn(String),
}

/// Progress sink that remembers everything it was told.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn steps(&self) -> Vec<(usize, usize)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Step(done, total) => Some((done, total)),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Warn(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn progress(&self, completed: usize, total: usize) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::Step(completed, total));
    }

    fn info(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::Info(message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push(ProgressEvent::Warn(message.to_string()));
    }
}
