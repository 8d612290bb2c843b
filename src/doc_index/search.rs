//! Doc index query path (spec §4.4 `search`, `readDocument`,
//! `listFrameworks`).
//!
//! The query is split on whitespace, empty tokens dropped, and each
//! surviving token is double-quoted before being handed to FTS5 — this
//! enforces literal phrase matching per token and prevents a user query
//! from injecting FTS5 operators (`OR`, `NOT`, `*`, column filters).
//! Ranking is `bm25()` ascending (lower is better), then a title-length
//! tiebreak; `limit` is applied after sorting.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::errors::CupertinoError;
use crate::models::{satisfies_minimum, FrameworkCount, SearchResultItem};

#[derive(Debug, Default, Clone)]
pub struct SearchFilters {
    pub source: Option<String>,
    pub framework: Option<String>,
    pub language: Option<String>,
    pub include_archive: bool,
    pub min_ios: Option<String>,
    pub min_macos: Option<String>,
    pub min_tvos: Option<String>,
    pub min_watchos: Option<String>,
    pub min_visionos: Option<String>,
}

/// Build the literal-phrase FTS5 MATCH expression for `query`.
///
/// Returns [`CupertinoError::InvalidQuery`] if every token is dropped
/// (empty query, or a query of whitespace only).
pub fn build_match_expression(query: &str) -> Result<String, CupertinoError> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();

    if tokens.is_empty() {
        return Err(CupertinoError::InvalidQuery(
            "query must contain at least one non-whitespace token".to_string(),
        ));
    }
    Ok(tokens.join(" "))
}

pub async fn search(
    pool: &SqlitePool,
    query: &str,
    filters: &SearchFilters,
    limit: i64,
) -> Result<Vec<SearchResultItem>> {
    let match_expr = build_match_expression(query).map_err(anyhow::Error::from)?;

    let rows = sqlx::query(
        r#"
        SELECT d.uri, d.source, d.framework, d.language, d.title, d.summary, d.summary_truncated,
               d.availability_string, d.min_ios_major, d.min_ios_minor,
               d.min_macos_major, d.min_macos_minor, d.min_tvos_major, d.min_tvos_minor,
               d.min_watchos_major, d.min_watchos_minor, d.min_visionos_major, d.min_visionos_minor,
               bm25(documents_fts) AS rank, length(d.title) AS title_len
        FROM documents_fts
        JOIN documents d ON d.uri = documents_fts.uri
        WHERE documents_fts MATCH ?
        ORDER BY rank ASC, title_len ASC
        "#,
    )
    .bind(&match_expr)
    .fetch_all(pool)
    .await?;

    let mut results = Vec::new();
    for row in rows {
        let source: String = row.get("source");
        let framework: String = row.get("framework");

        if let Some(src) = &filters.source {
            if &source != src {
                continue;
            }
        }
        if let Some(fw) = &filters.framework {
            if &framework != fw {
                continue;
            }
        }
        if !filters.include_archive && source == "apple-archive" {
            continue;
        }
        if let Some(lang) = &filters.language {
            let row_lang: Option<String> = row.get("language");
            if row_lang.as_deref() != Some(lang.as_str()) {
                continue;
            }
        }
        if !platform_filters_satisfied(&row, filters) {
            continue;
        }

        results.push(SearchResultItem {
            uri: row.get("uri"),
            source,
            framework,
            title: row.get("title"),
            summary: row.get("summary"),
            summary_truncated: row.get::<i64, _>("summary_truncated") != 0,
            availability_string: row.get("availability_string"),
            rank: row.get("rank"),
        });
    }

    results.truncate(limit.max(0) as usize);
    Ok(results)
}

fn platform_filters_satisfied(row: &sqlx::sqlite::SqliteRow, filters: &SearchFilters) -> bool {
    let checks: [(&Option<String>, &str, &str); 5] = [
        (&filters.min_ios, "min_ios_major", "min_ios_minor"),
        (&filters.min_macos, "min_macos_major", "min_macos_minor"),
        (&filters.min_tvos, "min_tvos_major", "min_tvos_minor"),
        (&filters.min_watchos, "min_watchos_major", "min_watchos_minor"),
        (&filters.min_visionos, "min_visionos_major", "min_visionos_minor"),
    ];

    for (requested, major_col, minor_col) in checks {
        let Some(requested) = requested else { continue };
        let major: Option<i64> = row.try_get(major_col).ok();
        let minor: Option<i64> = row.try_get(minor_col).ok();
        let (Some(major), Some(minor)) = (major, minor) else {
            return false;
        };
        let stored = format!("{major}.{minor}");
        if !satisfies_minimum(&stored, requested) {
            return false;
        }
    }
    true
}

pub async fn read_document(
    pool: &SqlitePool,
    uri: &str,
) -> Result<Option<(String, Option<String>)>> {
    let row = sqlx::query("SELECT content, json_data FROM documents WHERE uri = ?")
        .bind(uri)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| (r.get("content"), r.get("json_data"))))
}

pub async fn list_frameworks(pool: &SqlitePool) -> Result<Vec<FrameworkCount>> {
    let rows = sqlx::query(
        "SELECT framework, COUNT(*) AS document_count FROM documents GROUP BY framework ORDER BY framework",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| FrameworkCount {
            framework: r.get("framework"),
            document_count: r.get("document_count"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_match_expression_quotes_each_token() {
        let expr = build_match_expression("async throws").unwrap();
        assert_eq!(expr, "\"async\" \"throws\"");
    }

    #[test]
    fn build_match_expression_rejects_empty_query() {
        assert!(build_match_expression("   ").is_err());
    }

    #[test]
    fn build_match_expression_escapes_embedded_quotes() {
        let expr = build_match_expression("say \"hi\"").unwrap();
        assert!(expr.contains("\"\""));
    }

    #[test]
    fn build_match_expression_treats_fts_operators_as_literal() {
        let expr = build_match_expression("a:b OR c*").unwrap();
        assert_eq!(expr, "\"a:b\" \"OR\" \"c*\"");
    }
}
