//! Gemini CLI Provider
//!
//! Default collaborator, invoked as `gemini chat --prompt <prompt>`.
//! Single-shot execution; fallback to other collaborators is handled by
//! ProviderChain.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use super::{AnalysisProvider, ProviderOutput, run_cli};
use crate::types::{DossierError, Result};

const INSTALL_HINT: &str = "npm install -g @google/generative-ai-cli";

#[derive(Debug, Default)]
pub struct GeminiCliProvider;

impl GeminiCliProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnalysisProvider for GeminiCliProvider {
    async fn run(&self, prompt: &str, deadline: Duration) -> Result<ProviderOutput> {
        let mut cmd = Command::new("gemini");
        cmd.arg("chat").arg("--prompt").arg(prompt);
        run_cli(self.name(), cmd, deadline, INSTALL_HINT).await
    }

    fn name(&self) -> &str {
        "gemini"
    }

    async fn health_check(&self) -> Result<bool> {
        let output = Command::new("gemini")
            .arg("--version")
            .output()
            .await
            .map_err(|e| DossierError::not_found("gemini", e.to_string()))?;

        if output.status.success() {
            let version = String::from_utf8_lossy(&output.stdout);
            info!("Gemini CLI available: {}", version.trim());
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires gemini CLI installed"]
    async fn test_health_check() {
        let provider = GeminiCliProvider::new();
        assert!(provider.health_check().await.is_ok());
    }
}
