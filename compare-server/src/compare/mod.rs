//! Prompt comparison across models.
//!
//! This module provides:
//! - `ComparisonDispatcher`: one prompt, many models, concurrently
//! - `BatchOrchestrator`: many prompts, one after another
//! - `ProgressSink`: caller-visible progress for both

mod batch;
mod dispatcher;
mod progress;

pub use batch::{BatchOrchestrator, FALLBACK_PAIR};
pub use dispatcher::ComparisonDispatcher;
pub use progress::{NoProgress, ProgressSink, TracingProgress};
