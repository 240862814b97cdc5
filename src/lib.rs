//! # Dossier
//!
//! AI-driven use case document generator for GitHub repositories.
//!
//! Dossier drives external AI collaborators (the Gemini and Claude CLIs, or
//! the Gemini HTTP API) through a five-stage analysis pipeline and produces
//! a Markdown document with YAML front matter describing the repository as
//! an AI use case.
//!
//! ## Architecture
//!
//! - **ai**: collaborator abstraction and the output-extraction heuristic
//!   applied to everything collaborators return
//! - **pipeline**: the five-stage analyzer, per-stage payload schemas, the
//!   run-scoped stage store and the per-call audit log
//! - **credentials**: password-derived encrypted store for API keys
//! - **config**: layered configuration (defaults, global, project, env)
//! - **cli**: command handlers, URL validation, terminal output

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod pipeline;
pub mod types;

pub use ai::{AnalysisProvider, ProviderConfig, ProviderOutput, extract_clean_output};
pub use config::{ConfigLoader, DossierConfig, Precision};
pub use credentials::{EncryptedKeyStore, derive_key};
pub use pipeline::{AnalysisReport, MultiStageAnalyzer, StageStatus};
pub use types::{DossierError, Result};
