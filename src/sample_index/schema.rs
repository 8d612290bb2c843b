//! Sample index connection and schema migrations (spec §4.5).
//!
//! A separate SQLite file from the doc index, with a `user_version`
//! pragma bumped on migration (spec §4.4/§7 "SchemaMismatch": an index
//! found with an unexpected `user_version` is not auto-migrated unless a
//! migration has been declared for the observed version).

use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Current schema version. Bump this and add a migration arm in
/// [`run_migrations`] when the schema changes.
pub const SCHEMA_VERSION: i64 = 1;

pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new().max_connections(5).connect_with(options).await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version: i64 = sqlx::query_scalar("PRAGMA user_version").fetch_one(pool).await?;

    if current_version != 0 && current_version != SCHEMA_VERSION {
        bail!(
            "sample index schema mismatch: found user_version {}, expected {}. Rebuild the index.",
            current_version,
            SCHEMA_VERSION
        );
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            frameworks TEXT NOT NULL DEFAULT '[]',
            readme TEXT,
            web_url TEXT,
            zip_filename TEXT,
            file_count INTEGER NOT NULL DEFAULT 0,
            total_size INTEGER NOT NULL DEFAULT 0,
            indexed_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id TEXT NOT NULL,
            path TEXT NOT NULL,
            filename TEXT NOT NULL,
            folder TEXT NOT NULL,
            extension TEXT NOT NULL,
            content TEXT NOT NULL,
            size INTEGER NOT NULL,
            UNIQUE(project_id, path),
            FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS file_symbols (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            line INTEGER NOT NULL,
            column INTEGER NOT NULL,
            is_async INTEGER NOT NULL DEFAULT 0,
            is_throws INTEGER NOT NULL DEFAULT 0,
            is_public INTEGER NOT NULL DEFAULT 0,
            is_static INTEGER NOT NULL DEFAULT 0,
            attributes TEXT NOT NULL DEFAULT '[]',
            conformances TEXT NOT NULL DEFAULT '[]',
            generic_parameters TEXT NOT NULL DEFAULT '[]',
            signature TEXT,
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS file_imports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL,
            module_name TEXT NOT NULL,
            line INTEGER NOT NULL,
            is_exported INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (file_id) REFERENCES files(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    create_fts_if_missing(
        pool,
        "projects_fts",
        "CREATE VIRTUAL TABLE projects_fts USING fts5(id UNINDEXED, title, description, readme)",
    )
    .await?;
    create_fts_if_missing(
        pool,
        "files_fts",
        "CREATE VIRTUAL TABLE files_fts USING fts5(file_id UNINDEXED, project_id UNINDEXED, path UNINDEXED, content)",
    )
    .await?;
    create_fts_if_missing(
        pool,
        "file_symbols_fts",
        "CREATE VIRTUAL TABLE file_symbols_fts USING fts5(symbol_id UNINDEXED, file_id UNINDEXED, name, kind, attributes, signature, tokenize = 'unicode61 tokenchars ''_@''')",
    )
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_project_id ON files(project_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_file_symbols_file_id ON file_symbols(file_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_file_imports_file_id ON file_imports(file_id)")
        .execute(pool)
        .await?;

    if current_version == 0 {
        sqlx::query(&format!("PRAGMA user_version = {SCHEMA_VERSION}")).execute(pool).await?;
    }

    Ok(())
}

async fn create_fts_if_missing(pool: &SqlitePool, name: &str, ddl: &str) -> Result<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name=?")
            .bind(name)
            .fetch_one(pool)
            .await?;
    if !exists {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}
