//! Run-Scoped Stage Store
//!
//! Persists each stage's payload as `stage_N.json` under a per-run scratch
//! directory. Payloads are write-once per run; the directory is left on disk
//! at run end for post-mortem inspection alongside the audit log.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::Result;

#[derive(Debug, Clone)]
pub struct StageStore {
    run_dir: PathBuf,
}

impl StageStore {
    /// Open (creating if needed) the scratch directory for one run.
    pub fn open(base: &Path, run_id: &str) -> Result<Self> {
        let run_dir = base.join(run_id);
        fs::create_dir_all(&run_dir)?;
        Ok(Self { run_dir })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn stage_path(&self, stage_id: u8) -> PathBuf {
        self.run_dir.join(format!("stage_{}.json", stage_id))
    }

    /// Persist a stage payload. Overwrites any previous attempt for the
    /// same stage within this run.
    pub fn save<T: Serialize>(&self, stage_id: u8, payload: &T) -> Result<()> {
        let path = self.stage_path(stage_id);
        let json = serde_json::to_string_pretty(payload)?;
        fs::write(&path, json)?;
        debug!("Saved stage {} payload to {}", stage_id, path.display());
        Ok(())
    }

    /// Load a stage payload, `None` if the stage never produced one.
    pub fn load<T: DeserializeOwned>(&self, stage_id: u8) -> Result<Option<T>> {
        let path = self.stage_path(stage_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Keep the unparseable raw text next to the fallback payload so the
    /// original output is not lost.
    pub fn save_raw(&self, stage_id: u8, raw: &str) -> Result<()> {
        let path = self.run_dir.join(format!("stage_{}_raw.txt", stage_id));
        fs::write(path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::schema::Stage1Payload;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = StageStore::open(dir.path(), "run-1").unwrap();

        let mut payload = Stage1Payload::default();
        payload.basic_info.name = "dossier".to_string();
        store.save(1, &payload).unwrap();

        let loaded: Stage1Payload = store.load(1).unwrap().unwrap();
        assert_eq!(loaded.basic_info.name, "dossier");
    }

    #[test]
    fn test_load_missing_stage_is_none() {
        let dir = TempDir::new().unwrap();
        let store = StageStore::open(dir.path(), "run-1").unwrap();
        let loaded: Option<Stage1Payload> = store.load(3).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_runs_are_isolated() {
        let dir = TempDir::new().unwrap();
        let first = StageStore::open(dir.path(), "run-a").unwrap();
        let second = StageStore::open(dir.path(), "run-b").unwrap();

        first.save(1, &Stage1Payload::default()).unwrap();
        let loaded: Option<Stage1Payload> = second.load(1).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_raw_output_is_preserved() {
        let dir = TempDir::new().unwrap();
        let store = StageStore::open(dir.path(), "run-1").unwrap();
        store.save_raw(2, "not json at all").unwrap();
        let text = std::fs::read_to_string(store.run_dir().join("stage_2_raw.txt")).unwrap();
        assert_eq!(text, "not json at all");
    }
}
