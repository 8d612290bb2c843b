//! Unified search orchestrator (spec §4.6).
//!
//! Routes a query to a single source searcher or fans out across every
//! source in parallel, merging results and per-source counts. Each
//! sub-search runs under its own soft timeout; a failing or slow source
//! yields an empty result list rather than failing the whole query.

use std::time::Duration;

use sqlx::SqlitePool;

use crate::doc_index::search::{search as doc_search, SearchFilters};
use crate::models::{SearchResultItem, ALL_SOURCES};
use crate::sample_index::search::search_for_unified as sample_search;
use crate::unified::format::{PerSourceCount, TeaserResults, TeaserSlot, UnifiedSearchResult};

pub const DEFAULT_TEASER_LIMIT: i64 = 3;

pub struct OrchestratorOptions {
    pub fanout_timeout: Duration,
    pub default_limit: i64,
    pub teaser_limit: i64,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            fanout_timeout: Duration::from_millis(8000),
            default_limit: 12,
            teaser_limit: DEFAULT_TEASER_LIMIT,
        }
    }
}

/// `search(query, source?, ...)` (spec §4.6). When `filters.source` is
/// `Some`, routes directly to that source's searcher; otherwise fans out
/// across [`ALL_SOURCES`] under `opts.fanout_timeout` each and merges.
/// `samples_pool` is `None` when no sample index has been built; the
/// `samples` source then simply contributes no hits, same as any other
/// source whose backing store is absent.
pub async fn search(
    pool: &SqlitePool,
    samples_pool: Option<&SqlitePool>,
    query: &str,
    filters: &SearchFilters,
    limit: Option<i64>,
    opts: &OrchestratorOptions,
) -> anyhow::Result<UnifiedSearchResult> {
    let limit = limit.unwrap_or(opts.default_limit);

    if let Some(source) = &filters.source {
        let items =
            run_source_search(pool, samples_pool, query, filters, limit, opts.fanout_timeout).await;
        let count = items.len();
        return Ok(UnifiedSearchResult {
            items,
            per_source_counts: vec![PerSourceCount { source: source.clone(), count }],
            total_count: count,
        });
    }

    let mut handles = Vec::new();
    for source in ALL_SOURCES {
        let mut per_source_filters = filters.clone();
        per_source_filters.source = Some(source.to_string());
        let pool = pool.clone();
        let samples_pool = samples_pool.cloned();
        let query = query.to_string();
        let timeout = opts.fanout_timeout;
        handles.push(tokio::spawn(async move {
            let items =
                run_source_search(&pool, samples_pool.as_ref(), &query, &per_source_filters, limit, timeout)
                    .await;
            (source.to_string(), items)
        }));
    }

    let mut items = Vec::new();
    let mut per_source_counts = Vec::new();
    for handle in handles {
        match handle.await {
            Ok((source, mut source_items)) => {
                per_source_counts.push(PerSourceCount { source, count: source_items.len() });
                items.append(&mut source_items);
            }
            Err(e) => {
                tracing::warn!(error = %e, "fan-out source task panicked");
            }
        }
    }

    items.sort_by(|a, b| a.rank.partial_cmp(&b.rank).unwrap_or(std::cmp::Ordering::Equal));
    items.truncate(limit.max(0) as usize);

    let total_count = items.len();
    Ok(UnifiedSearchResult { items, per_source_counts, total_count })
}

async fn run_source_search(
    pool: &SqlitePool,
    samples_pool: Option<&SqlitePool>,
    query: &str,
    filters: &SearchFilters,
    limit: i64,
    timeout: Duration,
) -> Vec<SearchResultItem> {
    if filters.source.as_deref() == Some("samples") {
        let Some(samples_pool) = samples_pool else {
            return Vec::new();
        };
        return match tokio::time::timeout(timeout, sample_search(samples_pool, query, limit)).await {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                tracing::warn!(source = "samples", error = %e, "source search failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(source = "samples", "source search timed out");
                Vec::new()
            }
        };
    }

    match tokio::time::timeout(timeout, doc_search(pool, query, filters, limit)).await {
        Ok(Ok(items)) => items,
        Ok(Err(e)) => {
            tracing::warn!(source = ?filters.source, error = %e, "source search failed");
            Vec::new()
        }
        Err(_) => {
            tracing::warn!(source = ?filters.source, "source search timed out");
            Vec::new()
        }
    }
}

/// Fetch a small teaser from every source except `excluded_source` (the
/// one the caller already searched explicitly) and any archive source
/// excluded by `include_archive` (spec §4.6 "Teasers"). Failures are
/// silently dropped.
pub async fn fetch_teasers(
    pool: &SqlitePool,
    samples_pool: Option<&SqlitePool>,
    query: &str,
    excluded_source: &str,
    include_archive: bool,
    opts: &OrchestratorOptions,
) -> TeaserResults {
    let mut slots = Vec::new();

    for source in ALL_SOURCES {
        if *source == excluded_source {
            continue;
        }
        if !include_archive && *source == "apple-archive" {
            continue;
        }

        let filters = SearchFilters {
            source: Some(source.to_string()),
            include_archive,
            ..Default::default()
        };
        let items = run_source_search(
            pool,
            samples_pool,
            query,
            &filters,
            opts.teaser_limit,
            opts.fanout_timeout,
        )
        .await;
        if !items.is_empty() {
            slots.push(TeaserSlot { source: source.to_string(), items });
        }
    }

    TeaserResults { slots }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_with_explicit_source_skips_fanout() {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::doc_index::schema::connect(&dir.path().join("search.db")).await.unwrap();

        let filters = SearchFilters { source: Some("apple-docs".to_string()), ..Default::default() };
        let result = search(&pool, None, "view", &filters, Some(5), &OrchestratorOptions::default())
            .await
            .unwrap();
        assert_eq!(result.per_source_counts.len(), 1);
        assert_eq!(result.per_source_counts[0].source, "apple-docs");
    }
}
