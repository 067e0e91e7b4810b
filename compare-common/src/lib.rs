//! Models Compare Common Types
//!
//! Shared types used by the comparison server and its callers.

pub mod catalog;
pub mod chat;
pub mod comparison;

pub use catalog::{ModelDescriptor, SnapshotSource};
pub use chat::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, Usage};
pub use comparison::{
    BatchEntry, BatchRequest, BatchResult, BatchSummary, BatchTemplate, ComparisonRequest,
    ComparisonResponse, ComparisonResult, ComparisonSummary, ModelOutcome, ModelResults,
    RequestError, DEFAULT_MODELS, DEFAULT_SYSTEM_MESSAGE,
};
