//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//!
//! ## Design Principles
//!
//! - Single unified error type (DossierError) for the entire application
//! - Collaborator failures (not found, timeout, non-zero exit) are distinct
//!   variants so the pipeline can apply its skip semantics per failure kind
//! - No panic/unwrap - all errors are recoverable

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DossierError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Collaborator Errors
    // -------------------------------------------------------------------------
    /// The collaborator executable is not installed or not on PATH
    #[error("{provider} not found: {message}")]
    ProviderNotFound { provider: String, message: String },

    /// The collaborator call exceeded its hard deadline
    #[error("{provider} timed out after {duration:?}")]
    ProviderTimeout {
        provider: String,
        duration: Duration,
    },

    /// The collaborator ran but exited non-zero
    #[error("{provider} failed (exit {status:?}): {stderr}")]
    ProviderFailed {
        provider: String,
        status: Option<i32>,
        stderr: String,
    },

    /// HTTP transport failure for API collaborators
    #[error("HTTP error: {0}")]
    Http(String),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    #[error("Pipeline error in stage {stage} ({stage_name}): {message}")]
    Pipeline {
        stage: u8,
        stage_name: String,
        message: String,
    },

    // -------------------------------------------------------------------------
    // Credential Store Errors
    // -------------------------------------------------------------------------
    /// Decryption failed: wrong password, tampering, or key mismatch
    #[error("Credential error: {0}")]
    Credential(String),

    /// Store file is structurally invalid (truncated, short salt)
    #[error("Corrupt credential store: {0}")]
    CorruptStore(String),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Invalid repository URL: {0}")]
    InvalidUrl(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl DossierError {
    /// Create a provider-not-found error
    pub fn not_found(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderNotFound {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a provider timeout error
    pub fn timeout(provider: impl Into<String>, duration: Duration) -> Self {
        Self::ProviderTimeout {
            provider: provider.into(),
            duration,
        }
    }

    /// Create a pipeline error
    pub fn pipeline(stage: u8, stage_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline {
            stage,
            stage_name: stage_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a collaborator failure the pipeline may skip over
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::ProviderNotFound { .. }
                | Self::ProviderTimeout { .. }
                | Self::ProviderFailed { .. }
                | Self::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DossierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failure_classification() {
        assert!(DossierError::not_found("gemini", "No such file").is_provider_failure());
        assert!(DossierError::timeout("claude", Duration::from_secs(300)).is_provider_failure());
        assert!(DossierError::ProviderFailed {
            provider: "gemini".into(),
            status: Some(1),
            stderr: "boom".into(),
        }
        .is_provider_failure());
        assert!(!DossierError::Config("bad".into()).is_provider_failure());
        assert!(!DossierError::Credential("wrong password".into()).is_provider_failure());
    }

    #[test]
    fn test_timeout_display() {
        let err = DossierError::timeout("gemini", Duration::from_secs(300));
        assert!(err.to_string().contains("gemini"));
        assert!(err.to_string().contains("300"));
    }

    #[test]
    fn test_pipeline_display() {
        let err = DossierError::pipeline(2, "deep code analysis", "no predecessor data");
        assert_eq!(
            err.to_string(),
            "Pipeline error in stage 2 (deep code analysis): no predecessor data"
        );
    }
}
