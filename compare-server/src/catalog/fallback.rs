//! Built-in catalog served when the remote catalog is unreachable.

use models_compare_common::ModelDescriptor;

pub const FALLBACK_MODEL_IDS: [&str; 8] = [
    "gpt-4o",
    "gpt-4o-mini",
    "Phi-3.5-MoE-instruct",
    "Phi-3-mini-128k-instruct",
    "Llama-3.3-70B-Instruct",
    "Meta-Llama-3-8B-Instruct",
    "Mistral-large",
    "Mistral-small",
];

/// The fixed fallback list. Only name, publisher, summary and context window
/// are known; everything else stays at its default.
pub fn fallback_models() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor::new("gpt-4o", "GPT-4o", "OpenAI")
            .with_summary("OpenAI's most advanced multimodal model")
            .with_context_window(128_000),
        ModelDescriptor::new("gpt-4o-mini", "GPT-4o-mini", "OpenAI")
            .with_summary("Smaller, efficient version of GPT-4o")
            .with_context_window(128_000),
        ModelDescriptor::new("Phi-3.5-MoE-instruct", "Phi-3.5-MOE Instruct", "Microsoft")
            .with_summary("A mixture of experts model from Microsoft")
            .with_context_window(131_072),
        ModelDescriptor::new("Phi-3-mini-128k-instruct", "Phi-3-Mini Instruct 128k", "Microsoft")
            .with_summary("Small model with large context window")
            .with_context_window(131_072),
        ModelDescriptor::new("Llama-3.3-70B-Instruct", "Meta Llama 3.3 70B Instruct", "Meta")
            .with_summary("Advanced reasoning and instruction following")
            .with_context_window(128_000),
        ModelDescriptor::new("Meta-Llama-3-8B-Instruct", "Meta Llama 3 8B Instruct", "Meta")
            .with_summary("Balanced performance and efficiency")
            .with_context_window(8_192),
        ModelDescriptor::new("Mistral-large", "Mistral Large", "Mistral AI")
            .with_summary("Mistral's flagship model for complex reasoning")
            .with_context_window(32_768),
        ModelDescriptor::new("Mistral-small", "Mistral Small", "Mistral AI")
            .with_summary("Efficient model for low-latency use cases")
            .with_context_window(32_768),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_ids_match_constant() {
        let ids: Vec<String> = fallback_models().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, FALLBACK_MODEL_IDS);
    }

    #[test]
    fn test_fallback_leaves_unknown_fields_empty() {
        for model in fallback_models() {
            assert!(!model.display_name.is_empty());
            assert!(!model.summary.is_empty());
            assert!(model.context_window > 0);
            assert!(model.version.is_empty());
            assert!(model.asset_id.is_empty());
            assert_eq!(model.popularity, 0.0);
        }
    }
}
