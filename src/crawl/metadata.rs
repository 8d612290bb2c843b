//! Crawl metadata: per-URL page records, per-framework counters, and the
//! checkpointed session state (spec §3 "Crawl metadata", §4.2).
//!
//! `CrawlMetadata` is an owned struct behind a `tokio::sync::Mutex`, the
//! same single-writer guard the teacher codebase uses for its SQLite pool,
//! applied here to an in-memory map plus a `metadata.json` file on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::{CrawlStatistics, FrameworkStats, PageMetadata};

/// Checkpointed queue/visited state enabling crawl resume (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSessionState {
    pub visited: Vec<String>,
    pub queue: Vec<(String, usize)>,
    pub start_url: String,
    pub output_directory: PathBuf,
    pub session_start_time: DateTime<Utc>,
    pub last_save_time: DateTime<Utc>,
    pub is_active: bool,
}

/// On-disk shape of `metadata.json` (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct MetadataFile {
    #[serde(default)]
    pages: HashMap<String, PageMetadata>,
    #[serde(default)]
    frameworks: HashMap<String, FrameworkStats>,
    #[serde(default)]
    crawl_state: Option<CrawlSessionState>,
    #[serde(default)]
    stats: CrawlStatistics,
    #[serde(default)]
    last_crawl: Option<DateTime<Utc>>,
}

/// Serialize `value` and write it atomically to `path`: a sibling temp
/// file in the same directory, then a rename over the target. Shared by
/// [`CrawlMetadata::persist`] and [`crate::remote_save::RemoteSaveState`].
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write_json_str(path, json)
}

fn atomic_write_json_str(path: &Path, json: String) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating metadata directory {}", dir.display()))?;
    let tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| "creating temp file for metadata write")?;
    std::fs::write(tmp.path(), json)?;
    tmp.persist(path)
        .with_context(|| format!("renaming metadata into place at {}", path.display()))?;
    Ok(())
}

pub struct CrawlMetadata {
    path: PathBuf,
    inner: Mutex<MetadataFile>,
}

impl CrawlMetadata {
    /// Load metadata from `path`, validating that persisted file references
    /// are still live (spec §4.2 "Metadata validation on load"). Falls back
    /// to an empty record if the file is absent, unreadable, or fails
    /// validation.
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        let file = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<MetadataFile>(&content) {
                Ok(parsed) if Self::validate(&parsed) => parsed,
                _ => MetadataFile::default(),
            },
            Err(_) => MetadataFile::default(),
        };

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(file),
        })
    }

    /// Spot-check up to 100 evenly-spaced page records; discard the whole
    /// metadata file if fewer than half the sampled backing files exist.
    fn validate(file: &MetadataFile) -> bool {
        if file.pages.is_empty() {
            return true;
        }
        let paths: Vec<&PageMetadata> = file.pages.values().collect();
        let sample_size = paths.len().min(100);
        let stride = (paths.len() / sample_size).max(1);
        let sampled: Vec<&&PageMetadata> = paths.iter().step_by(stride).take(sample_size).collect();
        if sampled.is_empty() {
            return true;
        }
        let existing = sampled
            .iter()
            .filter(|p| Path::new(&p.file_path).exists())
            .count();
        existing * 2 >= sampled.len()
    }

    /// `true` if `url` should be (re)crawled: forced, unknown, hash differs,
    /// or the backing file is missing (spec §4.2).
    pub async fn should_recrawl(
        &self,
        url: &str,
        fresh_hash: &str,
        file_path: &str,
        force: bool,
    ) -> bool {
        if force {
            return true;
        }
        let guard = self.inner.lock().await;
        match guard.pages.get(url) {
            None => true,
            Some(existing) => {
                existing.content_hash != fresh_hash || !Path::new(file_path).exists()
            }
        }
    }

    pub async fn update_page(&self, url: String, meta: PageMetadata) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.pages.insert(url, meta);
        Ok(())
    }

    pub async fn record_framework_error(&self, framework: &str) {
        let mut guard = self.inner.lock().await;
        guard.frameworks.entry(framework.to_string()).or_default().errors += 1;
    }

    pub async fn record_framework_page(&self, framework: &str, is_new: bool) {
        let mut guard = self.inner.lock().await;
        let entry = guard.frameworks.entry(framework.to_string()).or_default();
        entry.pages += 1;
        if is_new {
            entry.new += 1;
        } else {
            entry.updated += 1;
        }
    }

    pub async fn mark_framework_complete(&self, framework: &str) {
        let mut guard = self.inner.lock().await;
        guard.frameworks.entry(framework.to_string()).or_default().status =
            crate::models::CrawlStatus::Complete;
    }

    pub async fn save_session_state(&self, state: CrawlSessionState) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.crawl_state = Some(state);
        drop(guard);
        self.persist().await
    }

    /// Write session state if the wall clock since the last save exceeds
    /// `interval_secs` (spec §4.2 `autoSaveIfNeeded`).
    pub async fn auto_save_if_needed(
        &self,
        state: &CrawlSessionState,
        interval_secs: u64,
    ) -> Result<bool> {
        let should_save = {
            let guard = self.inner.lock().await;
            match &guard.crawl_state {
                Some(existing) => {
                    let elapsed = Utc::now().signed_duration_since(existing.last_save_time);
                    elapsed.num_seconds() as u64 >= interval_secs
                }
                None => true,
            }
        };
        if should_save {
            self.save_session_state(state.clone()).await?;
        }
        Ok(should_save)
    }

    pub async fn clear_session_state(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.crawl_state = None;
        drop(guard);
        self.persist().await
    }

    pub async fn session_state(&self) -> Option<CrawlSessionState> {
        self.inner.lock().await.crawl_state.clone()
    }

    pub async fn record_stats(&self, total: u64, skipped: u64, errors: u64) {
        let mut guard = self.inner.lock().await;
        guard.stats.total_pages += total;
        guard.stats.skipped_pages += skipped;
        guard.stats.errors += errors;
    }

    pub async fn finalize_crawl(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.crawl_state = None;
        guard.last_crawl = Some(Utc::now());
        drop(guard);
        self.persist().await
    }

    /// Write the metadata file atomically: serialize to a sibling temp file
    /// in the same directory, then rename over the target.
    async fn persist(&self) -> Result<()> {
        let guard = self.inner.lock().await;
        let json = serde_json::to_string_pretty(&*guard)?;
        drop(guard);
        atomic_write_json_str(&self.path, json)
    }

    pub async fn page(&self, url: &str) -> Option<PageMetadata> {
        self.inner.lock().await.pages.get(url).cloned()
    }

    /// Snapshot of every crawled page record, keyed by URL (used by `save`
    /// to rebuild the doc index from what's already on disk).
    pub async fn all_pages(&self) -> HashMap<String, PageMetadata> {
        self.inner.lock().await.pages.clone()
    }

    pub async fn framework_stats(&self) -> HashMap<String, FrameworkStats> {
        self.inner.lock().await.frameworks.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_recrawl_unknown_url() {
        let dir = tempfile::tempdir().unwrap();
        let meta = CrawlMetadata::load_or_create(&dir.path().join("metadata.json"))
            .await
            .unwrap();
        assert!(
            meta.should_recrawl("https://x/y", "hash", "missing.md", false)
                .await
        );
    }

    #[tokio::test]
    async fn should_recrawl_forced_true() {
        let dir = tempfile::tempdir().unwrap();
        let meta = CrawlMetadata::load_or_create(&dir.path().join("metadata.json"))
            .await
            .unwrap();
        let file_path = dir.path().join("page.md");
        std::fs::write(&file_path, "content").unwrap();
        meta.update_page(
            "https://x/y".to_string(),
            PageMetadata {
                uri: "apple-docs://swiftui/view".to_string(),
                source: "apple-docs".to_string(),
                framework: "swiftui".to_string(),
                file_path: file_path.to_string_lossy().to_string(),
                content_hash: "samehash".to_string(),
                depth: 0,
                last_crawled: Utc::now(),
            },
        )
        .await
        .unwrap();
        assert!(
            meta.should_recrawl(
                "https://x/y",
                "samehash",
                &file_path.to_string_lossy(),
                true
            )
            .await
        );
    }

    #[tokio::test]
    async fn should_recrawl_false_when_hash_matches_and_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let meta = CrawlMetadata::load_or_create(&dir.path().join("metadata.json"))
            .await
            .unwrap();
        let file_path = dir.path().join("page.md");
        std::fs::write(&file_path, "content").unwrap();
        meta.update_page(
            "https://x/y".to_string(),
            PageMetadata {
                uri: "apple-docs://swiftui/view".to_string(),
                source: "apple-docs".to_string(),
                framework: "swiftui".to_string(),
                file_path: file_path.to_string_lossy().to_string(),
                content_hash: "samehash".to_string(),
                depth: 0,
                last_crawled: Utc::now(),
            },
        )
        .await
        .unwrap();
        assert!(
            !meta
                .should_recrawl(
                    "https://x/y",
                    "samehash",
                    &file_path.to_string_lossy(),
                    false
                )
                .await
        );
    }

    #[tokio::test]
    async fn persist_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let meta = CrawlMetadata::load_or_create(&path).await.unwrap();
        meta.update_page(
            "https://x/y".to_string(),
            PageMetadata {
                uri: "apple-docs://swiftui/view".to_string(),
                source: "apple-docs".to_string(),
                framework: "swiftui".to_string(),
                file_path: "page.md".to_string(),
                content_hash: "h".to_string(),
                depth: 0,
                last_crawled: Utc::now(),
            },
        )
        .await
        .unwrap();
        meta.finalize_crawl().await.unwrap();

        let reloaded = CrawlMetadata::load_or_create(&path).await.unwrap();
        assert!(reloaded.page("https://x/y").await.is_some());
    }
}
