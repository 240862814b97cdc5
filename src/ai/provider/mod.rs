//! Analysis Collaborator Abstraction
//!
//! Defines the AnalysisProvider trait for the opaque external tools that
//! perform text generation. The pipeline depends only on the tri-state
//! contract: a call yields (stdout, stderr, exit status), or fails with a
//! distinct not-found / timeout error.
//!
//! ## Modules
//!
//! - `gemini`: Gemini CLI collaborator
//! - `claude`: Claude CLI collaborator
//! - `gemini_api`: Gemini HTTP API collaborator

mod claude;
mod gemini;
mod gemini_api;

pub use claude::ClaudeCliProvider;
pub use gemini::GeminiCliProvider;
pub use gemini_api::GeminiApiProvider;

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::types::{DossierError, Result};

// =============================================================================
// Provider Output
// =============================================================================

/// Raw result of one collaborator call.
///
/// Both streams are captured verbatim for the audit log; nothing is
/// interpreted here. A non-zero status is a normal return, not an error.
#[derive(Debug, Clone)]
pub struct ProviderOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code (or HTTP status for API collaborators); `None`
    /// when the process was terminated by a signal.
    pub status: Option<i32>,
}

impl ProviderOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Shared collaborator handle passed into the pipeline.
pub type SharedProvider = Arc<dyn AnalysisProvider>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for analysis collaborators
///
/// Note: API keys are never serialized to output; providers convert the key
/// to SecretString internally for runtime protection.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "gemini", "claude", "gemini-api", "auto"
    pub provider: String,
    /// Model name (API collaborators only)
    pub model: Option<String>,
    /// API key for HTTP collaborators, never serialized
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL override
    #[serde(default)]
    pub api_base: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            api_key: None,
            api_base: None,
        }
    }
}

// =============================================================================
// Analysis Provider Trait
// =============================================================================

/// Opaque external analysis collaborator
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Run one prompt to completion under a hard deadline.
    ///
    /// Returns the captured output regardless of exit status. Fails only
    /// for timeout, a missing executable, or a transport-level error.
    async fn run(&self, prompt: &str, deadline: Duration) -> Result<ProviderOutput>;

    /// Provider name for logging and audit records
    fn name(&self) -> &str;

    /// Check if the collaborator is reachable
    async fn health_check(&self) -> Result<bool>;
}

/// Create a shared collaborator from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiCliProvider::new())),
        "claude" => Ok(Arc::new(ClaudeCliProvider::new())),
        "gemini-api" => Ok(Arc::new(GeminiApiProvider::new(config.clone())?)),
        "auto" => Ok(Arc::new(ProviderChain::new(vec![
            Arc::new(GeminiCliProvider::new()),
            Arc::new(ClaudeCliProvider::new()),
        ]))),
        _ => Err(DossierError::Config(format!(
            "Unknown provider: {}. Supported: gemini, claude, gemini-api, auto",
            config.provider
        ))),
    }
}

// =============================================================================
// CLI Process Execution
// =============================================================================

/// Spawn a collaborator CLI and wait for it under a hard deadline.
///
/// The spawn error is mapped to ProviderNotFound when the binary is missing;
/// an expired deadline abandons the call with no partial-output salvage.
pub(crate) async fn run_cli(
    provider: &str,
    mut cmd: Command,
    deadline: Duration,
    install_hint: &str,
) -> Result<ProviderOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Spawning {} (deadline: {:?})", provider, deadline);

    let child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DossierError::not_found(provider, format!("{}. Install: {}", e, install_hint))
        } else {
            DossierError::Io(e)
        }
    })?;

    let output = timeout(deadline, child.wait_with_output())
        .await
        .map_err(|_| DossierError::timeout(provider, deadline))??;

    if !output.status.success() {
        warn!(
            "{} exited with {:?}",
            provider,
            output.status.code()
        );
    }

    Ok(ProviderOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        status: output.status.code(),
    })
}

// =============================================================================
// Provider Chain
// =============================================================================

/// Ordered fallthrough over multiple collaborators (the `auto` provider).
///
/// Each collaborator is tried once; a failed call (error or non-zero exit)
/// moves on to the next. No retry within a collaborator - the original tools
/// are expensive, blocking calls.
pub struct ProviderChain {
    providers: Vec<SharedProvider>,
}

impl ProviderChain {
    pub fn new(providers: Vec<SharedProvider>) -> Self {
        Self { providers }
    }
}

#[async_trait]
impl AnalysisProvider for ProviderChain {
    async fn run(&self, prompt: &str, deadline: Duration) -> Result<ProviderOutput> {
        let mut last_err = None;

        for provider in &self.providers {
            match provider.run(prompt, deadline).await {
                Ok(output) if output.success() => return Ok(output),
                Ok(output) => {
                    warn!(
                        "{} exited {:?}, trying next provider",
                        provider.name(),
                        output.status
                    );
                    last_err = Some(DossierError::ProviderFailed {
                        provider: provider.name().to_string(),
                        status: output.status,
                        stderr: output.stderr,
                    });
                }
                Err(e) => {
                    warn!("{} unavailable: {}, trying next provider", provider.name(), e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            DossierError::not_found("auto", "no collaborators configured")
        }))
    }

    fn name(&self) -> &str {
        "auto"
    }

    async fn health_check(&self) -> Result<bool> {
        for provider in &self.providers {
            if provider.health_check().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
