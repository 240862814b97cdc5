//! Configuration
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/dossier/config.toml)
//! 3. Project config (.dossier/config.toml)
//! 4. Environment variables (DOSSIER_* prefix, `__` as the level separator)

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::ProviderConfig;
use crate::constants::{dirs, pipeline};
use crate::types::{DossierError, Result};

// =============================================================================
// Configuration Types
// =============================================================================

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DossierConfig {
    /// Configuration version
    pub version: String,

    /// Analysis collaborator settings
    pub provider: ProviderConfig,

    /// Pipeline timing settings
    pub pipeline: PipelineConfig,

    /// Output location settings
    pub output: OutputConfig,
}

impl Default for DossierConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            provider: ProviderConfig::default(),
            pipeline: PipelineConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl DossierConfig {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.stage_timeout_secs == 0 {
            return Err(DossierError::Config(
                "pipeline.stage_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.pipeline.fast_timeout_secs == 0 {
            return Err(DossierError::Config(
                "pipeline.fast_timeout_secs must be greater than 0".to_string(),
            ));
        }

        match self.provider.provider.as_str() {
            "gemini" | "claude" | "gemini-api" | "auto" => Ok(()),
            other => Err(DossierError::Config(format!(
                "unknown provider '{}': expected gemini, claude, gemini-api or auto",
                other
            ))),
        }
    }

    /// Per-stage timeout for the selected precision.
    pub fn timeout_for(&self, precision: Precision) -> std::time::Duration {
        let secs = match precision {
            Precision::High => self.pipeline.stage_timeout_secs,
            Precision::Fast => self.pipeline.fast_timeout_secs,
        };
        std::time::Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Per-stage collaborator timeout for five-stage runs (seconds)
    pub stage_timeout_secs: u64,

    /// Collaborator timeout for single-pass runs (seconds)
    pub fast_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: pipeline::STAGE_TIMEOUT_SECS,
            fast_timeout_secs: pipeline::FAST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory final documents are written to
    pub use_cases_dir: PathBuf,

    /// Directory per-call audit logs are written to
    pub audit_dir: PathBuf,

    /// Directory stage scratch data is kept under, one subdir per run
    pub runs_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            use_cases_dir: PathBuf::from(dirs::USE_CASES),
            audit_dir: PathBuf::from(dirs::AUDIT_LOGS),
            runs_dir: PathBuf::from(dirs::STAGE_RUNS),
        }
    }
}

/// Analysis precision: full five-stage pipeline or one-shot generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Five-stage analysis (default)
    #[default]
    High,
    /// Single prompt, single call
    Fast,
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precision::High => write!(f, "high"),
            Precision::Fast => write!(f, "fast"),
        }
    }
}

impl std::str::FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Precision::High),
            "fast" => Ok(Precision::Fast),
            other => Err(format!("unknown precision '{}': expected high or fast", other)),
        }
    }
}

// =============================================================================
// Loader
// =============================================================================

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → env vars
    pub fn load() -> Result<DossierConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(DossierConfig::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                debug!("Loading global config from: {}", global_path.display());
                figment = figment.merge(Toml::file(&global_path));
            }
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        // e.g. DOSSIER_PROVIDER__MODEL -> provider.model
        figment = figment.merge(Env::prefixed("DOSSIER_").split("__").lowercase(true));

        let config: DossierConfig = figment
            .extract()
            .map_err(|e| DossierError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<DossierConfig> {
        let config: DossierConfig = Figment::new()
            .merge(Serialized::defaults(DossierConfig::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| DossierError::Config(format!("Configuration error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Global config directory (~/.config/dossier/)
    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dossier").map(|d| d.config_dir().to_path_buf())
    }

    /// Global config file path
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Project config file path
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".dossier/config.toml")
    }

    /// Encrypted credential store path, alongside the global config
    pub fn keystore_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join(dirs::KEYSTORE_FILE))
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config)
                    .map_err(|e| DossierError::Config(e.to_string()))?
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = DossierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.provider, "gemini");
        assert_eq!(config.pipeline.stage_timeout_secs, 300);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = DossierConfig::default();
        config.pipeline.stage_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = DossierConfig::default();
        config.provider.provider = "mystery".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_merges_over_defaults() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[provider]\nprovider = \"claude\"\n\n[pipeline]\nstage_timeout_secs = 60"
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.provider.provider, "claude");
        assert_eq!(config.pipeline.stage_timeout_secs, 60);
        // Untouched sections keep their defaults.
        assert_eq!(config.pipeline.fast_timeout_secs, 120);
    }

    #[test]
    fn test_precision_round_trip() {
        assert_eq!("fast".parse::<Precision>().unwrap(), Precision::Fast);
        assert_eq!(Precision::High.to_string(), "high");
        assert!("medium".parse::<Precision>().is_err());
    }

    #[test]
    fn test_timeout_for_precision() {
        let config = DossierConfig::default();
        assert_eq!(config.timeout_for(Precision::High).as_secs(), 300);
        assert_eq!(config.timeout_for(Precision::Fast).as_secs(), 120);
    }
}
