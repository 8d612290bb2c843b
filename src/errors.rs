//! Typed error taxonomy (spec §7).
//!
//! The crawl loop and the indexes use [`CupertinoError`] where callers need
//! to match on error kind (MCP tool dispatch, CLI exit-code mapping).
//! Everywhere else, `anyhow::Result` carries the error to the CLI boundary,
//! matching how the teacher's command handlers propagate failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CupertinoError {
    /// Network error, HTTP 5xx, or a render timeout. Retried up to twice
    /// with a renderer recycle before being recorded and skipped.
    #[error("transient fetch failure for {url}: {reason}")]
    TransientFetch { url: String, reason: String },

    /// HTTP 404/403 on a single record; not retried.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// HTTP 403 with zero rate-limit budget remaining.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Bad HTML, non-UTF-8, or invalid JSON that no fallback could recover.
    #[error("content parse error for {source_id}: {reason}")]
    ContentParseError { source_id: String, reason: String },

    /// SQLite failure or disk-full condition. Fatal to the enclosing crawl.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Index found but with an unexpected `user_version`.
    #[error("schema mismatch: found version {found}, expected {expected}")]
    SchemaMismatch { found: i64, expected: i64 },

    /// Empty or unparseable user query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// `serve`/`search` invoked without an existing index.
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),
}

impl CupertinoError {
    /// `true` for error kinds the crawl loop should retry (with a renderer
    /// recycle) rather than record and move past immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CupertinoError::TransientFetch { .. })
    }
}
