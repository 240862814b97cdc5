//! Repository Identification & Output Files
//!
//! GitHub URL validation (shape only, no network probing), repository name
//! extraction and final document persistence.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use url::Url;

use crate::types::{DossierError, Result};

/// Front-matter keys the final document is required to carry.
const REQUIRED_FRONT_MATTER_KEYS: &[&str] = &[
    "title",
    "summary",
    "category",
    "industry",
    "createdAt",
    "updatedAt",
    "status",
    "github_link",
    "contributors",
    "tags",
];

/// A validated `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub url: String,
}

impl RepoRef {
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Validate a GitHub repository URL and extract owner and repository name.
///
/// Accepts only `github.com` hosts with at least an owner and repository
/// path segment; a trailing `.git` on the repository is stripped.
pub fn validate_github_url(raw: &str) -> Result<RepoRef> {
    let parsed = Url::parse(raw)
        .map_err(|e| DossierError::InvalidUrl(format!("{}: {}", raw, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(DossierError::InvalidUrl(format!(
                "unsupported scheme '{}': expected http(s)",
                other
            )));
        }
    }

    if parsed.host_str() != Some("github.com") {
        return Err(DossierError::InvalidUrl(format!(
            "not a GitHub URL: {}",
            raw
        )));
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    if segments.len() < 2 {
        return Err(DossierError::InvalidUrl(format!(
            "not a repository URL (need owner and repository): {}",
            raw
        )));
    }

    let owner = segments[0].to_string();
    let repo = segments[1].trim_end_matches(".git").to_string();
    if repo.is_empty() {
        return Err(DossierError::InvalidUrl(format!(
            "empty repository name: {}",
            raw
        )));
    }

    Ok(RepoRef {
        url: format!("https://github.com/{}/{}", owner, repo),
        owner,
        repo,
    })
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Check the final document's YAML front matter.
///
/// Returns `None` when the document does not open with a parseable
/// front-matter block; otherwise the required keys the block is missing.
/// Advisory only - the document is saved either way.
pub fn missing_front_matter_keys(document: &str) -> Option<Vec<&'static str>> {
    let rest = document.strip_prefix("---\n")?;
    let end = rest.find("\n---")?;
    let block: serde_yaml::Value = serde_yaml::from_str(&rest[..end]).ok()?;
    let map = block.as_mapping()?;

    Some(
        REQUIRED_FRONT_MATTER_KEYS
            .iter()
            .filter(|key| !map.contains_key(&serde_yaml::Value::from(**key)))
            .copied()
            .collect(),
    )
}

/// Write the final document to `<dir>/<repo>.md`, appending a footer that
/// points at the audit log directory. The document itself is stored as
/// produced by the pipeline.
pub fn save_document(
    dir: &Path,
    repo: &RepoRef,
    document: &str,
    audit_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.md", sanitize_filename(&repo.repo)));

    let footer = format!(
        "\n\n---\n*This document was generated by an AI assistant. For detailed \
         analysis logs, see the `{}` directory.*\n",
        audit_dir.display()
    );

    fs::write(&path, format!("{}{}", document, footer))?;
    info!("Document saved: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_valid_repository_url() {
        let repo = validate_github_url("https://github.com/rust-lang/cargo").unwrap();
        assert_eq!(repo.owner, "rust-lang");
        assert_eq!(repo.repo, "cargo");
        assert_eq!(repo.slug(), "rust-lang/cargo");
    }

    #[test]
    fn test_git_suffix_is_stripped() {
        let repo = validate_github_url("https://github.com/rust-lang/cargo.git").unwrap();
        assert_eq!(repo.repo, "cargo");
        assert_eq!(repo.url, "https://github.com/rust-lang/cargo");
    }

    #[test]
    fn test_extra_path_segments_are_ignored() {
        let repo =
            validate_github_url("https://github.com/rust-lang/cargo/tree/master/src").unwrap();
        assert_eq!(repo.slug(), "rust-lang/cargo");
    }

    #[test]
    fn test_non_github_host_rejected() {
        assert!(validate_github_url("https://gitlab.com/owner/repo").is_err());
    }

    #[test]
    fn test_owner_only_rejected() {
        assert!(validate_github_url("https://github.com/rust-lang").is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(validate_github_url("not a url").is_err());
        assert!(validate_github_url("ftp://github.com/a/b").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my-repo_2.0"), "my-repo_2.0");
        assert_eq!(sanitize_filename("weird name/slash"), "weird_name_slash");
        assert_eq!(sanitize_filename("日本語"), "___");
    }

    #[test]
    fn test_front_matter_complete() {
        let doc = "---\n\
                   title: \"T\"\nsummary: \"S\"\ncategory: \"c\"\nindustry: \"i\"\n\
                   createdAt: \"2026-08-25\"\nupdatedAt: \"2026-08-25\"\nstatus: \"active\"\n\
                   github_link: \"https://github.com/a/b\"\n\
                   contributors:\n  - alice\ntags:\n  - rust\n\
                   ---\n\n# Body\n";
        assert_eq!(missing_front_matter_keys(doc), Some(vec![]));
    }

    #[test]
    fn test_front_matter_reports_missing_keys() {
        let doc = "---\ntitle: \"T\"\nsummary: \"S\"\n---\n\n# Body\n";
        let missing = missing_front_matter_keys(doc).unwrap();
        assert!(missing.contains(&"category"));
        assert!(missing.contains(&"tags"));
        assert!(!missing.contains(&"title"));
    }

    #[test]
    fn test_document_without_front_matter() {
        assert!(missing_front_matter_keys("# Just markdown\n").is_none());
    }

    #[test]
    fn test_save_document_appends_footer() {
        let dir = TempDir::new().unwrap();
        let repo = validate_github_url("https://github.com/owner/repo").unwrap();

        let path = save_document(
            dir.path(),
            &repo,
            "# Doc\n\nBody.",
            Path::new(".cli_outputs"),
        )
        .unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("# Doc\n\nBody."));
        assert!(content.contains(".cli_outputs"));
    }
}
