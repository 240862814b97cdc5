//! Command Handlers
//!
//! Implements the `generate`, `key` and `config` subcommands on top of the
//! pipeline, the credential store and the configuration loader.
//!
//! ## Modules
//!
//! - `progress`: cosmetic terminal spinner
//! - `repo`: GitHub URL validation and document persistence

pub mod progress;
pub mod repo;

pub use progress::Spinner;
pub use repo::{
    RepoRef, missing_front_matter_keys, sanitize_filename, save_document, validate_github_url,
};

use std::path::PathBuf;

use console::style;
use secrecy::SecretString;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ai::create_provider;
use crate::config::{ConfigLoader, DossierConfig, Precision};
use crate::credentials::EncryptedKeyStore;
use crate::pipeline::{
    AnalysisReport, AuditLog, MultiStageAnalyzer, StageStatus, StageStore,
};
use crate::types::{DossierError, Result};

/// Service name the Gemini HTTP provider's key is stored under.
const GEMINI_SERVICE: &str = "gemini";

// =============================================================================
// generate
// =============================================================================

#[derive(Debug)]
pub struct GenerateOptions {
    pub url: String,
    pub provider: Option<String>,
    pub precision: Precision,
    pub output: Option<PathBuf>,
}

pub async fn generate(opts: GenerateOptions) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    if let Some(provider) = opts.provider {
        config.provider.provider = provider;
        config.validate()?;
    }

    let repo = validate_github_url(&opts.url)?;
    info!("Analyzing repository {}", repo.slug());

    resolve_stored_api_key(&mut config);
    let provider = create_provider(&config.provider)?;

    let run_id = Uuid::new_v4().to_string();
    let store = StageStore::open(&config.output.runs_dir, &run_id)?;
    let audit = AuditLog::open(&config.output.audit_dir)?;

    let analyzer = MultiStageAnalyzer::new(
        repo.url.clone(),
        provider,
        store,
        audit,
        config.timeout_for(opts.precision),
    );

    let spinner = Spinner::start(format!("Analyzing {}", repo.slug()));
    let result = match opts.precision {
        Precision::High => analyzer.run().await,
        Precision::Fast => analyzer.run_single().await,
    };
    let report = match result {
        Ok(report) => {
            spinner.finish(&format!("{} Analysis finished", style("✓").green())).await;
            report
        }
        Err(e) => {
            spinner.finish(&format!("{} Analysis failed", style("✗").red())).await;
            return Err(e);
        }
    };

    print_stage_summary(&report);

    let document = report.document.as_deref().ok_or_else(|| {
        DossierError::pipeline(
            5,
            "Stage 5: Final Synthesis",
            format!(
                "no document produced; see audit logs in {}",
                report.audit_dir.display()
            ),
        )
    })?;

    match missing_front_matter_keys(document) {
        None => warn!("Document does not open with a YAML front matter block"),
        Some(missing) if !missing.is_empty() => {
            warn!("Front matter is missing keys: {}", missing.join(", "));
        }
        Some(_) => {}
    }

    let out_dir = opts.output.unwrap_or_else(|| config.output.use_cases_dir.clone());
    let path = save_document(&out_dir, &repo, document, &report.audit_dir)?;

    if report.degraded {
        warn!("Run was degraded; some stages were skipped");
        println!(
            "{} Document saved with reduced analysis: {}",
            style("!").yellow(),
            path.display()
        );
    } else {
        println!("{} Document saved: {}", style("✓").green(), path.display());
    }
    println!("  Stage data: {}", report.run_dir.display());
    println!("  Audit logs: {}", report.audit_dir.display());

    Ok(())
}

fn print_stage_summary(report: &AnalysisReport) {
    for stage in &report.stages {
        let mark = match stage.status {
            StageStatus::Ok => style("✓").green(),
            StageStatus::Fallback => style("!").yellow(),
            StageStatus::Skipped => style("✗").red(),
        };
        let note = match stage.status {
            StageStatus::Ok => "",
            StageStatus::Fallback => " (fallback payload)",
            StageStatus::Skipped => " (skipped)",
        };
        println!("  {} {}{}", mark, stage.name, note);
    }
}

/// Fill the HTTP provider's API key from the encrypted store when neither
/// config nor environment supplies one. Needs DOSSIER_PASSWORD to unlock.
fn resolve_stored_api_key(config: &mut DossierConfig) {
    if config.provider.provider != "gemini-api"
        || config.provider.api_key.is_some()
        || std::env::var("GEMINI_API_KEY").is_ok()
    {
        return;
    }

    let password = match std::env::var("DOSSIER_PASSWORD") {
        Ok(p) => SecretString::from(p),
        Err(_) => return,
    };
    let path = match ConfigLoader::keystore_path() {
        Some(p) => p,
        None => return,
    };

    if let Some(secret) = EncryptedKeyStore::new(path).load(GEMINI_SERVICE, &password) {
        info!("Using API key from the credential store");
        config.provider.api_key = Some(secret);
    }
}

// =============================================================================
// key
// =============================================================================

fn open_keystore() -> Result<EncryptedKeyStore> {
    let path = ConfigLoader::keystore_path().ok_or_else(|| {
        DossierError::Config("cannot determine credential store location".to_string())
    })?;
    Ok(EncryptedKeyStore::new(path))
}

pub fn key_set(service: &str, secret: &str, password: &SecretString) -> Result<()> {
    let store = open_keystore()?;
    store.save(service, secret, password)?;
    println!(
        "{} Secret for '{}' stored in {}",
        style("✓").green(),
        service,
        store.path().display()
    );
    Ok(())
}

pub fn key_show(service: &str, password: &SecretString) -> Result<()> {
    let store = open_keystore()?;
    match store.load(service, password) {
        Some(secret) => {
            println!("{}", secret);
            Ok(())
        }
        None => Err(DossierError::Credential(format!(
            "no secret stored for '{}' (or wrong password)",
            service
        ))),
    }
}
