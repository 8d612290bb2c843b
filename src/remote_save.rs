//! Remote-ingest checkpoint (spec §6 `remote-save-state.json`, Open
//! Question #1).
//!
//! The actual upload to a code-forge release endpoint is an external
//! collaborator whose contract, not implementation, is in scope (spec §1
//! "Out of scope: the release-packaging command"). What this module owns
//! is the checkpoint file itself: `save --remote` writes it after every
//! phase transition, and a resumed run picks up from `phase`.

use serde::{Deserialize, Serialize};

use crate::crawl::metadata::atomic_write_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteSavePhase {
    Discovering,
    Uploading,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSaveState {
    pub source: String,
    pub phase: RemoteSavePhase,
    pub cursor: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl RemoteSaveState {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            phase: RemoteSavePhase::Discovering,
            cursor: None,
            updated_at: chrono::Utc::now(),
        }
    }

    pub fn load(path: &std::path::Path) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    pub fn advance(&mut self, phase: RemoteSavePhase, cursor: Option<String>) {
        self.phase = phase;
        self.cursor = cursor;
        self.updated_at = chrono::Utc::now();
    }

    pub fn persist(&self, path: &std::path::Path) -> anyhow::Result<()> {
        atomic_write_json(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_discovering() {
        let state = RemoteSaveState::new("apple-docs");
        assert_eq!(state.phase, RemoteSavePhase::Discovering);
        assert!(state.cursor.is_none());
    }

    #[test]
    fn persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remote-save-state.json");
        let mut state = RemoteSaveState::new("swift-org");
        state.advance(RemoteSavePhase::Uploading, Some("page-42".to_string()));
        state.persist(&path).unwrap();

        let loaded = RemoteSaveState::load(&path).unwrap();
        assert_eq!(loaded.phase, RemoteSavePhase::Uploading);
        assert_eq!(loaded.cursor.as_deref(), Some("page-42"));
    }
}
