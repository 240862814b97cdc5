//! AI Collaborator Layer
//!
//! Provider abstraction over the external AI tools that perform the actual
//! text generation, plus the output extraction heuristic applied to
//! everything they return.

pub mod extract;
pub mod provider;

pub use extract::extract_clean_output;
pub use provider::{
    AnalysisProvider, ClaudeCliProvider, GeminiApiProvider, GeminiCliProvider, ProviderChain,
    ProviderConfig, ProviderOutput, SharedProvider, create_provider,
};
