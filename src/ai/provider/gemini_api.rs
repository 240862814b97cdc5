//! Gemini HTTP API Provider
//!
//! Collaborator using the Gemini generateContent REST API directly, for
//! environments without the CLI tools. The API key comes from config, the
//! GEMINI_API_KEY env var, or the encrypted credential store.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{AnalysisProvider, ProviderConfig, ProviderOutput};
use crate::constants::network;
use crate::types::{DossierError, Result};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Gemini API provider with secure key handling
pub struct GeminiApiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiApiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiApiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiApiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .ok_or_else(|| {
                DossierError::Config(
                    "Gemini API key not found. Set GEMINI_API_KEY, provide it in config, \
                     or store it with `dossier key set gemini`"
                        .to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| DossierError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base,
            model,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[async_trait]
impl AnalysisProvider for GeminiApiProvider {
    async fn run(&self, prompt: &str, deadline: Duration) -> Result<ProviderOutput> {
        debug!("Calling Gemini API (model: {})", self.model);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.expose_secret())])
            .json(&request)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DossierError::timeout(self.name(), deadline)
                } else if e.is_connect() {
                    DossierError::not_found(self.name(), format!("endpoint unreachable: {}", e))
                } else {
                    DossierError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // API-level failures surface through the tri-state contract so
            // the pipeline can audit-log the body verbatim.
            let body = response.text().await.unwrap_or_default();
            return Ok(ProviderOutput {
                stdout: String::new(),
                stderr: body,
                status: Some(status.as_u16() as i32),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DossierError::Http(format!("Malformed API response: {}", e)))?;

        let text: String = parsed
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(ProviderOutput {
            stdout: text,
            stderr: String::new(),
            status: Some(0),
        })
    }

    fn name(&self) -> &str {
        "gemini-api"
    }

    async fn health_check(&self) -> Result<bool> {
        info!("Gemini API configured for model {}", self.model);
        Ok(true)
    }
}
