//! Multi-prompt batches over the dispatcher.

use std::sync::Arc;

use models_compare_common::{
    BatchEntry, BatchResult, BatchSummary, BatchTemplate, ComparisonResponse, ModelResults,
    RequestError,
};

use super::{ComparisonDispatcher, ProgressSink};
use crate::error::{Error, Result};

/// Pair used when the caller names no models and the catalog has fewer than two.
pub const FALLBACK_PAIR: [&str; 2] = ["gpt-4o-mini", "Mistral-small"];

const PROMPT_PREVIEW_CHARS: usize = 50;

/// Runs a list of prompts one after another against the same model set.
pub struct BatchOrchestrator {
    dispatcher: Arc<ComparisonDispatcher>,
}

impl BatchOrchestrator {
    pub fn new(dispatcher: Arc<ComparisonDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Compare every prompt in order, sequentially.
    ///
    /// Each prompt gets an entry, whatever its outcome; only an invalid
    /// template or a missing access token stops the batch.
    pub async fn run(
        &self,
        prompts: &[String],
        template: &BatchTemplate,
        progress: &dyn ProgressSink,
    ) -> Result<BatchResult> {
        if prompts.is_empty() {
            return Err(RequestError::NoPrompts.into());
        }
        template.validate()?;
        self.dispatcher.ensure_credentials()?;

        let models = if template.models.is_empty() {
            self.default_pair().await
        } else {
            template.models.clone()
        };

        let total = prompts.len();
        let mut entries = Vec::with_capacity(total);
        let mut summary = BatchSummary {
            prompts_processed: 0,
            models_compared: models.clone(),
            succeeded: 0,
            failed: 0,
        };

        for (idx, prompt) in prompts.iter().enumerate() {
            progress.info(&format!(
                "Processing prompt {}/{}: {}...",
                idx + 1,
                total,
                preview(prompt)
            ));
            progress.progress(idx, total);

            let request = template.request_for(prompt, &models);
            let entry = match self.dispatcher.compare(&request, progress).await {
                Ok(ComparisonResponse::Completed(result)) => BatchEntry {
                    prompt: prompt.clone(),
                    results: result.results,
                    error: None,
                },
                Ok(ComparisonResponse::NoValidModels { error, .. }) => BatchEntry {
                    prompt: prompt.clone(),
                    results: ModelResults::new(),
                    error: Some(error),
                },
                Err(e @ Error::MissingCredential(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!("Prompt {} failed: {}", idx + 1, e);
                    BatchEntry {
                        prompt: prompt.clone(),
                        results: ModelResults::new(),
                        error: Some(e.to_string()),
                    }
                }
            };

            summary.prompts_processed += 1;
            summary.succeeded += entry.results.successes();
            summary.failed += entry.results.failures();
            entries.push(entry);
        }

        progress.progress(total, total);

        Ok(BatchResult {
            batch_results: entries,
            summary,
        })
    }

    /// First two distinct catalog ids in id order, so the default does not
    /// depend on how the catalog happened to be ordered.
    async fn default_pair(&self) -> Vec<String> {
        let mut ids = self.dispatcher.registry().ids().await;
        ids.sort();
        ids.dedup();
        if ids.len() >= 2 {
            ids.truncate(2);
            ids
        } else {
            FALLBACK_PAIR.iter().map(|m| m.to_string()).collect()
        }
    }
}

fn preview(prompt: &str) -> &str {
    match prompt.char_indices().nth(PROMPT_PREVIEW_CHARS) {
        Some((end, _)) => &prompt[..end],
        None => prompt,
    }
}
