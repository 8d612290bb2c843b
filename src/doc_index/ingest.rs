//! Doc index write path (spec §4.4 `indexDocument`).

use anyhow::Result;
use sqlx::SqlitePool;

use crate::models::{normalize_version, Document};

/// Upsert `doc` by `uri` and mirror it into the FTS5 tables. Deletes and
/// reinserts the FTS rows inside the same transaction, since FTS5 has no
/// stable-rowid `INSERT OR REPLACE`.
pub async fn index_document(pool: &SqlitePool, doc: &Document) -> Result<()> {
    let mut tx = pool.begin().await?;

    let avail = &doc.availability;
    let (min_ios_major, min_ios_minor) = split_version(avail.min_ios.as_deref());
    let (min_macos_major, min_macos_minor) = split_version(avail.min_macos.as_deref());
    let (min_tvos_major, min_tvos_minor) = split_version(avail.min_tvos.as_deref());
    let (min_watchos_major, min_watchos_minor) = split_version(avail.min_watchos.as_deref());
    let (min_visionos_major, min_visionos_minor) = split_version(avail.min_visionos.as_deref());

    sqlx::query(
        r#"
        INSERT INTO documents (
            uri, source, framework, language, title, content, summary, summary_truncated,
            file_path, content_hash, last_crawled, json_data,
            min_ios_major, min_ios_minor, min_macos_major, min_macos_minor,
            min_tvos_major, min_tvos_minor, min_watchos_major, min_watchos_minor,
            min_visionos_major, min_visionos_minor, availability_string
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(uri) DO UPDATE SET
            source = excluded.source,
            framework = excluded.framework,
            language = excluded.language,
            title = excluded.title,
            content = excluded.content,
            summary = excluded.summary,
            summary_truncated = excluded.summary_truncated,
            file_path = excluded.file_path,
            content_hash = excluded.content_hash,
            last_crawled = excluded.last_crawled,
            json_data = excluded.json_data,
            min_ios_major = excluded.min_ios_major,
            min_ios_minor = excluded.min_ios_minor,
            min_macos_major = excluded.min_macos_major,
            min_macos_minor = excluded.min_macos_minor,
            min_tvos_major = excluded.min_tvos_major,
            min_tvos_minor = excluded.min_tvos_minor,
            min_watchos_major = excluded.min_watchos_major,
            min_watchos_minor = excluded.min_watchos_minor,
            min_visionos_major = excluded.min_visionos_major,
            min_visionos_minor = excluded.min_visionos_minor,
            availability_string = excluded.availability_string
        "#,
    )
    .bind(&doc.uri)
    .bind(&doc.source)
    .bind(&doc.framework)
    .bind(&doc.language)
    .bind(&doc.title)
    .bind(&doc.content)
    .bind(&doc.summary)
    .bind(doc.summary_truncated)
    .bind(&doc.file_path)
    .bind(&doc.content_hash)
    .bind(doc.last_crawled.timestamp())
    .bind(&doc.json_data)
    .bind(min_ios_major)
    .bind(min_ios_minor)
    .bind(min_macos_major)
    .bind(min_macos_minor)
    .bind(min_tvos_major)
    .bind(min_tvos_minor)
    .bind(min_watchos_major)
    .bind(min_watchos_minor)
    .bind(min_visionos_major)
    .bind(min_visionos_minor)
    .bind(availability_string(avail))
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM documents_fts WHERE uri = ?")
        .bind(&doc.uri)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO documents_fts (uri, title, content) VALUES (?, ?, ?)")
        .bind(&doc.uri)
        .bind(&doc.title)
        .bind(&doc.content)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM frameworks_fts WHERE framework = ? AND title = ?")
        .bind(&doc.framework)
        .bind(&doc.title)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO frameworks_fts (framework, title, content) VALUES (?, ?, ?)")
        .bind(&doc.framework)
        .bind(&doc.title)
        .bind(&doc.content)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

fn split_version(version: Option<&str>) -> (Option<i64>, Option<i64>) {
    match version {
        Some(v) => {
            let (major, minor) = normalize_version(v);
            (Some(major as i64), Some(minor as i64))
        }
        None => (None, None),
    }
}

fn availability_string(avail: &crate::models::PlatformAvailability) -> String {
    let mut parts = Vec::new();
    if let Some(v) = &avail.min_ios {
        parts.push(format!("iOS {v}+"));
    }
    if let Some(v) = &avail.min_macos {
        parts.push(format!("macOS {v}+"));
    }
    if let Some(v) = &avail.min_tvos {
        parts.push(format!("tvOS {v}+"));
    }
    if let Some(v) = &avail.min_watchos {
        parts.push(format!("watchOS {v}+"));
    }
    if let Some(v) = &avail.min_visionos {
        parts.push(format!("visionOS {v}+"));
    }
    parts.join(", ")
}

pub async fn document_count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents").fetch_one(pool).await?;
    Ok(count)
}
