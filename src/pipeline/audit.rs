//! Audit Log
//!
//! Writes one human-readable Markdown file per external collaborator call:
//! repository, provider, stage, timestamp, the full prompt, and both output
//! streams verbatim. Files are never overwritten and the write happens
//! whether or not the call succeeded - this is the only diagnostic trail
//! when a collaborator misbehaves.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

use crate::types::Result;

#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

/// One external call, captured verbatim.
#[derive(Debug)]
pub struct AuditRecord<'a> {
    pub repository: &'a str,
    pub provider: &'a str,
    pub stage_name: &'a str,
    pub prompt: &'a str,
    pub stdout: &'a str,
    pub stderr: &'a str,
}

impl AuditLog {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one record to a fresh timestamped file and return its path.
    pub fn record(&self, record: &AuditRecord<'_>) -> Result<PathBuf> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S%.3f").to_string();
        let stage_slug = record.stage_name.replace([':', ' ', '/'], "_");
        let path = self.dir.join(format!("{}_{}.log", timestamp, stage_slug));

        let content = format!(
            "# AI Analysis Log\n\n\
             - **Repository**: {}\n\
             - **AI Provider**: {}\n\
             - **Stage**: {}\n\
             - **Timestamp**: {}\n\n\
             ## Prompt\n\n```\n{}\n```\n\n\
             ## Raw STDOUT\n\n```\n{}\n```\n\n\
             ## Raw STDERR\n\n```\n{}\n```\n",
            record.repository,
            record.provider,
            record.stage_name,
            timestamp,
            record.prompt,
            record.stdout,
            record.stderr,
        );

        fs::write(&path, content)?;
        debug!("Audit record written: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample<'a>() -> AuditRecord<'a> {
        AuditRecord {
            repository: "https://github.com/owner/repo",
            provider: "gemini",
            stage_name: "Stage 1: Basic Analysis",
            prompt: "analyze this",
            stdout: "{\"ok\": true}",
            stderr: "",
        }
    }

    #[test]
    fn test_record_contains_all_fields() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::open(dir.path()).unwrap();
        let path = log.record(&sample()).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("https://github.com/owner/repo"));
        assert!(content.contains("**AI Provider**: gemini"));
        assert!(content.contains("Stage 1: Basic Analysis"));
        assert!(content.contains("analyze this"));
        assert!(content.contains("{\"ok\": true}"));
    }

    #[test]
    fn test_records_never_overwrite() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::open(dir.path()).unwrap();
        let first = log.record(&sample()).unwrap();
        let second = log.record(&sample()).unwrap();
        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
    }

    #[test]
    fn test_filename_has_no_colons() {
        let dir = TempDir::new().unwrap();
        let log = AuditLog::open(dir.path()).unwrap();
        let path = log.record(&sample()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(!name.contains(':'));
        assert!(name.ends_with(".log"));
    }
}
