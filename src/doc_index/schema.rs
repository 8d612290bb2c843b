//! Doc index connection and schema migrations (spec §4.4).
//!
//! Two FTS5 virtual tables, `documents_fts` and `frameworks_fts`, mirror the
//! `documents` table for keyword search and per-framework aggregation.
//! Because FTS5 lacks a stable-rowid `INSERT OR REPLACE`, a full rebuild
//! (`save`) removes the database file outright before recreating it,
//! rather than attempting an in-place FTS rewrite (spec §4.4 "Clean
//! rebuild").

use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

/// Remove the database file (and its WAL/SHM siblings) and recreate it,
/// as required before a full re-ingest (spec §4.4 "Clean rebuild").
pub async fn rebuild(db_path: &Path) -> Result<SqlitePool> {
    for suffix in ["", "-wal", "-shm"] {
        let path = format!("{}{}", db_path.display(), suffix);
        let _ = std::fs::remove_file(path);
    }
    connect(db_path).await
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            uri TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            framework TEXT NOT NULL,
            language TEXT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            summary TEXT NOT NULL,
            summary_truncated INTEGER NOT NULL DEFAULT 0,
            file_path TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            last_crawled INTEGER NOT NULL,
            json_data TEXT,
            min_ios_major INTEGER,
            min_ios_minor INTEGER,
            min_macos_major INTEGER,
            min_macos_minor INTEGER,
            min_tvos_major INTEGER,
            min_tvos_minor INTEGER,
            min_watchos_major INTEGER,
            min_watchos_minor INTEGER,
            min_visionos_major INTEGER,
            min_visionos_minor INTEGER,
            availability_string TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='documents_fts'",
    )
    .fetch_one(pool)
    .await?;
    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE documents_fts USING fts5(
                uri UNINDEXED,
                title,
                content,
                tokenize = 'unicode61'
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    let frameworks_fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='frameworks_fts'",
    )
    .fetch_one(pool)
    .await?;
    if !frameworks_fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE frameworks_fts USING fts5(
                framework UNINDEXED,
                title,
                content
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_source ON documents(source)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_framework ON documents(framework)")
        .execute(pool)
        .await?;

    Ok(())
}
