//! Configuration parsing and validation.
//!
//! Cupertino is configured via a TOML file (default: `~/.cupertino/config.toml`,
//! overridable with `--config`). The config defines the on-disk base directory
//! (spec §6), per-source crawl tuning, and retrieval defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl Config {
    pub fn docs_db_path(&self) -> PathBuf {
        self.base_dir.join("search.db")
    }

    pub fn samples_db_path(&self) -> PathBuf {
        self.base_dir.join("samples.db")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.base_dir.join("metadata.json")
    }

    pub fn remote_save_state_path(&self) -> PathBuf {
        self.base_dir.join("remote-save-state.json")
    }

    pub fn sample_code_dir(&self) -> PathBuf {
        self.base_dir.join("sample-code")
    }

    pub fn catalog_override_path(&self) -> PathBuf {
        self.base_dir.join("catalogs.toml")
    }

    /// Output of the Swift.org post-crawl priority-package generator (spec
    /// §4.8), consumed by later `fetch --type packages` runs.
    pub fn priority_packages_path(&self) -> PathBuf {
        self.base_dir.join("priority-packages.json")
    }
}

fn default_base_dir() -> PathBuf {
    home_dir().join(".cupertino")
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlConfig {
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_checkpoint_interval_secs")]
    pub checkpoint_interval_secs: u64,
    #[serde(default = "default_renderer_recycle_every")]
    pub renderer_recycle_every: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub force_recrawl: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            request_delay_ms: default_request_delay_ms(),
            checkpoint_interval_secs: default_checkpoint_interval_secs(),
            renderer_recycle_every: default_renderer_recycle_every(),
            max_retries: default_max_retries(),
            force_recrawl: false,
        }
    }
}

fn default_max_pages() -> usize {
    10_000
}
fn default_max_depth() -> usize {
    6
}
fn default_request_delay_ms() -> u64 {
    250
}
fn default_checkpoint_interval_secs() -> u64 {
    30
}
fn default_renderer_recycle_every() -> u32 {
    50
}
fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    #[serde(default = "default_teaser_limit")]
    pub teaser_limit: i64,
    #[serde(default = "default_fanout_timeout_ms")]
    pub fanout_timeout_ms: u64,
    #[serde(default = "default_summary_word_cap")]
    pub summary_word_cap: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            teaser_limit: default_teaser_limit(),
            fanout_timeout_ms: default_fanout_timeout_ms(),
            summary_word_cap: default_summary_word_cap(),
        }
    }
}

fn default_limit() -> i64 {
    12
}
fn default_teaser_limit() -> i64 {
    3
}
fn default_fanout_timeout_ms() -> u64 {
    8_000
}
fn default_summary_word_cap() -> usize {
    crate::summary::DEFAULT_SUMMARY_WORD_CAP
}

/// Per-source crawl start URLs and allowed prefixes (spec §4.3, §6 CLI
/// `--type`). A source absent here still appears in [`crate::catalogs`]
/// for read-only lookups, but `fetch --type <source>` requires an
/// explicit entry.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub apple_docs: Option<CrawlSourceConfig>,
    #[serde(default)]
    pub apple_archive: Option<CrawlSourceConfig>,
    #[serde(default)]
    pub swift_evolution: Option<CrawlSourceConfig>,
    #[serde(default)]
    pub swift_org: Option<CrawlSourceConfig>,
    #[serde(default)]
    pub swift_book: Option<CrawlSourceConfig>,
    #[serde(default)]
    pub hig: Option<CrawlSourceConfig>,
    #[serde(default)]
    pub packages: Option<CrawlSourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CrawlSourceConfig {
    pub start_url: String,
    #[serde(default)]
    pub allowed_prefixes: Vec<String>,
    /// Name of an environment variable holding a code-forge API token
    /// (spec §6). Absence of the named variable is non-fatal.
    #[serde(default)]
    pub token_env: Option<String>,
    /// Whether this source exposes a DocC-style JSON API the crawler
    /// should prefer over rendering HTML (spec §4.1, §4.3 step 3).
    #[serde(default)]
    pub prefers_json_api: bool,
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config {
            base_dir: default_base_dir(),
            crawl: CrawlConfig::default(),
            retrieval: RetrievalConfig::default(),
            sources: SourcesConfig::default(),
        });
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.crawl.max_depth > 64 {
        anyhow::bail!("crawl.max_depth must be <= 64");
    }
    if config.retrieval.default_limit < 1 {
        anyhow::bail!("retrieval.default_limit must be >= 1");
    }
    if config.retrieval.summary_word_cap == 0 {
        anyhow::bail!("retrieval.summary_word_cap must be > 0");
    }

    Ok(config)
}
