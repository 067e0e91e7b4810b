//! Comparison request and result types.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::chat::{ChatCompletionRequest, ChatCompletionResponse, Usage};

pub const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful assistant.";

/// Models compared when a request names none.
pub const DEFAULT_MODELS: [&str; 3] = ["gpt-4o", "Mistral-small", "Phi-3-mini-128k-instruct"];

/// Reasons a comparison request is rejected before any work is done.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("temperature must be between 0 and 2, got {0}")]
    Temperature(f32),
    #[error("top_p must be between 0 and 1, got {0}")]
    TopP(f32),
    #[error("max_tokens must be greater than 0")]
    MaxTokens,
    #[error("at least one prompt is required")]
    NoPrompts,
    #[error("output_path must be a relative file path inside the output directory, got '{0}'")]
    OutputPath(String),
}

fn default_system_message() -> String {
    DEFAULT_SYSTEM_MESSAGE.to_string()
}
fn default_temperature() -> f32 {
    1.0
}
fn default_top_p() -> f32 {
    1.0
}
fn default_max_tokens() -> u32 {
    1000
}

fn check_sampling(temperature: f32, top_p: f32, max_tokens: u32) -> Result<(), RequestError> {
    if !(0.0..=2.0).contains(&temperature) {
        return Err(RequestError::Temperature(temperature));
    }
    if !(0.0..=1.0).contains(&top_p) {
        return Err(RequestError::TopP(top_p));
    }
    if max_tokens == 0 {
        return Err(RequestError::MaxTokens);
    }
    Ok(())
}

/// One prompt to run against a set of models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub prompt: String,
    #[serde(default = "default_system_message")]
    pub system_message: String,
    /// Requested model ids, in the order results should be reported.
    /// Empty means [`DEFAULT_MODELS`].
    #[serde(default)]
    pub models: Vec<String>,
    /// Sampling temperature, 0.0 to 2.0.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Nucleus sampling cutoff, 0.0 to 1.0.
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl ComparisonRequest {
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            system_message: default_system_message(),
            models: Vec::new(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_system_message(mut self, system_message: &str) -> Self {
        self.system_message = system_message.to_string();
        self
    }

    /// Requested models, or the default trio when none were named.
    pub fn models_or_default(&self) -> Vec<String> {
        if self.models.is_empty() {
            DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
        } else {
            self.models.clone()
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.prompt.trim().is_empty() {
            return Err(RequestError::EmptyPrompt);
        }
        check_sampling(self.temperature, self.top_p, self.max_tokens)
    }

    /// The chat request sent to every model: system turn, then the prompt.
    pub fn to_chat_request(&self) -> ChatCompletionRequest {
        let mut chat = ChatCompletionRequest::from_turns(&self.system_message, &self.prompt);
        chat.temperature = Some(self.temperature);
        chat.top_p = Some(self.top_p);
        chat.max_tokens = Some(self.max_tokens);
        chat
    }
}

/// Settings shared by every prompt of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchTemplate {
    #[serde(default = "default_system_message")]
    pub system_message: String,
    /// Empty means "pick a default pair from the catalog".
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for BatchTemplate {
    fn default() -> Self {
        Self {
            system_message: default_system_message(),
            models: Vec::new(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl BatchTemplate {
    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        check_sampling(self.temperature, self.top_p, self.max_tokens)
    }

    /// Comparison request for one prompt of the batch.
    pub fn request_for(&self, prompt: &str, models: &[String]) -> ComparisonRequest {
        ComparisonRequest {
            prompt: prompt.to_string(),
            system_message: self.system_message.clone(),
            models: models.to_vec(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        }
    }
}

/// Batch request body: the prompts plus the shared template fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub prompts: Vec<String>,
    #[serde(flatten)]
    pub template: BatchTemplate,
}

/// What one model produced for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelOutcome {
    Success {
        content: String,
        finish_reason: Option<String>,
        usage: Usage,
    },
    Failure {
        error: String,
    },
}

impl ModelOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        ModelOutcome::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ModelOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ModelOutcome::Failure { error } => Some(error),
            ModelOutcome::Success { .. } => None,
        }
    }

    /// Reduce a completion to the first choice's text, finish reason and usage.
    pub fn from_response(response: &ChatCompletionResponse) -> Self {
        match response.first_choice() {
            Some(choice) => ModelOutcome::Success {
                content: choice.message.content.clone().unwrap_or_default(),
                finish_reason: choice.finish_reason.clone(),
                usage: response.usage.unwrap_or_default(),
            },
            None => ModelOutcome::failure("response contained no choices"),
        }
    }
}

/// Per-model outcomes keyed by model id, kept in request order.
///
/// Serializes as a JSON object whose key order is the insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResults(Vec<(String, ModelOutcome)>);

impl ModelResults {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert an outcome, replacing any earlier outcome for the same model.
    pub fn insert(&mut self, model: String, outcome: ModelOutcome) {
        match self.0.iter_mut().find(|(m, _)| *m == model) {
            Some(entry) => entry.1 = outcome,
            None => self.0.push((model, outcome)),
        }
    }

    pub fn get(&self, model: &str) -> Option<&ModelOutcome> {
        self.0.iter().find(|(m, _)| m == model).map(|(_, o)| o)
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(m, _)| m.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelOutcome)> {
        self.0.iter().map(|(m, o)| (m.as_str(), o))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn successes(&self) -> usize {
        self.0.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.len() - self.successes()
    }
}

impl FromIterator<(String, ModelOutcome)> for ModelResults {
    fn from_iter<T: IntoIterator<Item = (String, ModelOutcome)>>(iter: T) -> Self {
        let mut results = ModelResults::new();
        for (model, outcome) in iter {
            results.insert(model, outcome);
        }
        results
    }
}

impl Serialize for ModelResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (model, outcome) in &self.0 {
            map.serialize_entry(model, outcome)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ModelResults {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ResultsVisitor;

        impl<'de> Visitor<'de> for ResultsVisitor {
            type Value = ModelResults;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of model id to outcome")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut results = ModelResults::new();
                while let Some((model, outcome)) = access.next_entry::<String, ModelOutcome>()? {
                    results.insert(model, outcome);
                }
                Ok(results)
            }
        }

        deserializer.deserialize_map(ResultsVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub models_compared: Vec<String>,
    pub prompt: String,
    pub system_message: String,
}

/// Outcomes of one prompt across the validated models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub results: ModelResults,
    pub summary: ComparisonSummary,
}

/// What a comparison returns: results, or the structured "nothing to run" error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparisonResponse {
    Completed(ComparisonResult),
    NoValidModels {
        error: String,
        requested: Vec<String>,
        available_models: Vec<String>,
    },
}

/// One prompt's slot in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub prompt: String,
    pub results: ModelResults,
    /// Set when the prompt produced no per-model results at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub prompts_processed: usize,
    pub models_compared: Vec<String>,
    /// Model outcomes that produced a completion, across all prompts.
    pub succeeded: usize,
    /// Model outcomes that failed, across all prompts.
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub batch_results: Vec<BatchEntry>,
    pub summary: BatchSummary,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.batch_results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch_results.is_empty()
    }
}
