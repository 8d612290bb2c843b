//! Sample index query path (spec §4.5 `searchProjects`, `searchFiles`,
//! `searchSymbols`).

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::doc_index::search::build_match_expression;
use crate::errors::CupertinoError;
use crate::models::{FileSearchResult, Project, SearchResultItem};

pub async fn search_projects(pool: &SqlitePool, query: &str, limit: i64) -> Result<Vec<Project>> {
    let match_expr = build_match_expression(query).map_err(anyhow::Error::from)?;

    let rows = sqlx::query(
        r#"
        SELECT p.id, p.title, p.description, p.frameworks, p.readme, p.web_url,
               p.zip_filename, p.file_count, p.total_size, p.indexed_at,
               bm25(projects_fts) AS rank
        FROM projects_fts
        JOIN projects p ON p.id = projects_fts.id
        WHERE projects_fts MATCH ?
        ORDER BY rank ASC
        LIMIT ?
        "#,
    )
    .bind(&match_expr)
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            let frameworks_json: String = r.get("frameworks");
            let frameworks: Vec<String> = serde_json::from_str(&frameworks_json).unwrap_or_default();
            Project {
                id: r.get("id"),
                title: r.get("title"),
                description: r.get("description"),
                frameworks,
                readme: r.get("readme"),
                web_url: r.get("web_url"),
                zip_filename: r.get("zip_filename"),
                file_count: r.get("file_count"),
                total_size: r.get("total_size"),
                indexed_at: chrono::DateTime::from_timestamp(r.get::<i64, _>("indexed_at"), 0)
                    .unwrap_or_default(),
            }
        })
        .collect())
}

/// Search projects for the unified orchestrator's `samples` source (spec
/// §4.6), returning results in the same [`SearchResultItem`] shape
/// `doc_index::search::search` uses so sample-project hits can be merged
/// and rank-sorted alongside documentation hits.
pub async fn search_for_unified(
    pool: &SqlitePool,
    query: &str,
    limit: i64,
) -> Result<Vec<SearchResultItem>> {
    let match_expr = build_match_expression(query).map_err(anyhow::Error::from)?;

    let rows = sqlx::query(
        r#"
        SELECT p.id, p.title, p.description, p.frameworks,
               bm25(projects_fts) AS rank
        FROM projects_fts
        JOIN projects p ON p.id = projects_fts.id
        WHERE projects_fts MATCH ?
        ORDER BY rank ASC
        LIMIT ?
        "#,
    )
    .bind(&match_expr)
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            let frameworks_json: String = r.get("frameworks");
            let frameworks: Vec<String> = serde_json::from_str(&frameworks_json).unwrap_or_default();
            let id: String = r.get("id");
            SearchResultItem {
                uri: format!("samples://{id}"),
                source: "samples".to_string(),
                framework: frameworks.first().cloned().unwrap_or_default(),
                title: r.get("title"),
                summary: r.get("description"),
                summary_truncated: false,
                availability_string: String::new(),
                rank: r.get("rank"),
            }
        })
        .collect())
}

pub async fn search_files(
    pool: &SqlitePool,
    query: &str,
    project_id: Option<&str>,
    limit: i64,
) -> Result<Vec<FileSearchResult>> {
    let match_expr = build_match_expression(query).map_err(anyhow::Error::from)?;

    let rows = sqlx::query(
        r#"
        SELECT files_fts.project_id, files_fts.path,
               snippet(files_fts, 3, '**', '**', '...', 24) AS snippet,
               bm25(files_fts) AS rank
        FROM files_fts
        WHERE files_fts MATCH ? AND (?1 IS NULL OR files_fts.project_id = ?1)
        ORDER BY rank ASC
        LIMIT ?
        "#,
    )
    .bind(&match_expr)
    .bind(project_id)
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| {
            let path: String = r.get("path");
            let filename = path.rsplit('/').next().unwrap_or(&path).to_string();
            FileSearchResult {
                project_id: r.get("project_id"),
                path,
                filename,
                snippet: r.get("snippet"),
                rank: r.get("rank"),
            }
        })
        .collect())
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SymbolSearchResult {
    pub project_id: String,
    pub file_path: String,
    pub name: String,
    pub kind: String,
    pub signature: Option<String>,
    pub rank: f64,
}

pub async fn search_symbols(
    pool: &SqlitePool,
    query: &str,
    limit: i64,
) -> Result<Vec<SymbolSearchResult>> {
    let match_expr = build_match_expression(query).map_err(anyhow::Error::from)?;

    let rows = sqlx::query(
        r#"
        SELECT f.project_id, f.path AS file_path, s.name, s.kind, s.signature,
               bm25(file_symbols_fts) AS rank
        FROM file_symbols_fts
        JOIN file_symbols s ON s.id = file_symbols_fts.symbol_id
        JOIN files f ON f.id = s.file_id
        WHERE file_symbols_fts MATCH ?
        ORDER BY rank ASC
        LIMIT ?
        "#,
    )
    .bind(&match_expr)
    .bind(limit.max(0))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| SymbolSearchResult {
            project_id: r.get("project_id"),
            file_path: r.get("file_path"),
            name: r.get("name"),
            kind: r.get("kind"),
            signature: r.get("signature"),
            rank: r.get("rank"),
        })
        .collect())
}

pub async fn read_file(
    pool: &SqlitePool,
    project_id: &str,
    path: &str,
) -> Result<Option<String>, CupertinoError> {
    let row = sqlx::query("SELECT content FROM files WHERE project_id = ? AND path = ?")
        .bind(project_id)
        .bind(path)
        .fetch_optional(pool)
        .await
        .map_err(|e| CupertinoError::PersistenceError(e.to_string()))?;
    Ok(row.map(|r| r.get("content")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_projects_rejects_empty_query() {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::sample_index::schema::connect(&dir.path().join("samples.db"))
            .await
            .unwrap();
        let err = search_projects(&pool, "   ", 10).await.unwrap_err();
        assert!(err.to_string().contains("invalid query"));
    }

    #[tokio::test]
    async fn search_for_unified_rejects_empty_query() {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::sample_index::schema::connect(&dir.path().join("samples.db"))
            .await
            .unwrap();
        let err = search_for_unified(&pool, "   ", 10).await.unwrap_err();
        assert!(err.to_string().contains("invalid query"));
    }
}
