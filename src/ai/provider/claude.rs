//! Claude CLI Provider
//!
//! Collaborator invoked as `claude <prompt>`. Single-shot execution;
//! fallback is handled by ProviderChain.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use super::{AnalysisProvider, ProviderOutput, run_cli};
use crate::types::{DossierError, Result};

const INSTALL_HINT: &str = "https://github.com/anthropics/claude-code";

#[derive(Debug, Default)]
pub struct ClaudeCliProvider;

impl ClaudeCliProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnalysisProvider for ClaudeCliProvider {
    async fn run(&self, prompt: &str, deadline: Duration) -> Result<ProviderOutput> {
        let mut cmd = Command::new("claude");
        cmd.arg(prompt);
        run_cli(self.name(), cmd, deadline, INSTALL_HINT).await
    }

    fn name(&self) -> &str {
        "claude"
    }

    async fn health_check(&self) -> Result<bool> {
        let output = Command::new("claude")
            .arg("--version")
            .output()
            .await
            .map_err(|e| DossierError::not_found("claude", e.to_string()))?;

        if output.status.success() {
            let version = String::from_utf8_lossy(&output.stdout);
            info!("Claude CLI available: {}", version.trim());
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
