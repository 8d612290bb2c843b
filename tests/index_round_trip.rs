//! Round-trip tests against the doc index, sample index, and unified
//! orchestrator APIs directly (no CLI process), covering invariants the
//! black-box CLI tests don't reach: ranking across sources, teaser
//! exclusion, ZIP-backed sample ingest, and symbol/import extraction.

use chrono::Utc;
use cupertino::doc_index;
use cupertino::models::{Document, PlatformAvailability};
use cupertino::sample_index;
use cupertino::unified::orchestrator::{self, OrchestratorOptions};

fn doc(uri: &str, source: &str, framework: &str, title: &str, content: &str) -> Document {
    Document {
        uri: uri.to_string(),
        source: source.to_string(),
        framework: framework.to_string(),
        language: None,
        title: title.to_string(),
        content: content.to_string(),
        summary: content.to_string(),
        summary_truncated: false,
        file_path: format!("/tmp/{uri}.md"),
        content_hash: "h".to_string(),
        last_crawled: Utc::now(),
        json_data: None,
        availability: PlatformAvailability::default(),
    }
}

#[tokio::test]
async fn documents_are_searchable_across_sources_and_ranked() {
    let dir = tempfile::tempdir().unwrap();
    let pool = doc_index::schema::connect(&dir.path().join("search.db")).await.unwrap();

    doc_index::ingest::index_document(
        &pool,
        &doc(
            "apple-docs://SwiftUI/view",
            "apple-docs",
            "SwiftUI",
            "View",
            "A view that composes declaratively with state and bindings.",
        ),
    )
    .await
    .unwrap();
    doc_index::ingest::index_document(
        &pool,
        &doc(
            "swift-org://Concurrency/actor",
            "swift-org",
            "Concurrency",
            "Actor",
            "An actor isolates mutable state across concurrent tasks.",
        ),
    )
    .await
    .unwrap();

    assert_eq!(doc_index::ingest::document_count(&pool).await.unwrap(), 2);

    let opts = OrchestratorOptions::default();
    let filters = doc_index::search::SearchFilters::default();
    let result = orchestrator::search(&pool, None, "state", &filters, None, &opts).await.unwrap();
    assert_eq!(result.total_count, 2, "both documents mention \"state\"");
    assert_eq!(result.per_source_counts.len(), 2);
}

#[tokio::test]
async fn reindexing_the_same_uri_upserts_rather_than_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let pool = doc_index::schema::connect(&dir.path().join("search.db")).await.unwrap();

    let mut d = doc("apple-docs://SwiftUI/view", "apple-docs", "SwiftUI", "View", "first body");
    doc_index::ingest::index_document(&pool, &d).await.unwrap();
    d.content = "second body".to_string();
    d.summary = "second body".to_string();
    doc_index::ingest::index_document(&pool, &d).await.unwrap();

    assert_eq!(doc_index::ingest::document_count(&pool).await.unwrap(), 1);
    let (content, _) = doc_index::search::read_document(&pool, &d.uri).await.unwrap().unwrap();
    assert_eq!(content, "second body");
}

#[tokio::test]
async fn min_ios_filter_excludes_documents_below_the_requested_floor() {
    let dir = tempfile::tempdir().unwrap();
    let pool = doc_index::schema::connect(&dir.path().join("search.db")).await.unwrap();

    let mut d = doc("apple-docs://SwiftUI/view", "apple-docs", "SwiftUI", "View", "declarative interface");
    d.availability = PlatformAvailability::parse("iOS 13.0+, macOS 10.15+");
    doc_index::ingest::index_document(&pool, &d).await.unwrap();

    let mut filters = doc_index::search::SearchFilters::default();
    filters.min_ios = Some("14.0".to_string());
    let excluded = doc_index::search::search(&pool, "declarative", &filters, 10).await.unwrap();
    assert!(excluded.is_empty());

    filters.min_ios = Some("12.0".to_string());
    let included = doc_index::search::search(&pool, "declarative", &filters, 10).await.unwrap();
    assert_eq!(included.len(), 1);
}

#[tokio::test]
async fn teasers_exclude_the_searched_source_and_the_archive_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let pool = doc_index::schema::connect(&dir.path().join("search.db")).await.unwrap();

    doc_index::ingest::index_document(
        &pool,
        &doc("apple-docs://SwiftUI/view", "apple-docs", "SwiftUI", "View", "shared topic word"),
    )
    .await
    .unwrap();
    doc_index::ingest::index_document(
        &pool,
        &doc("swift-org://Concurrency/actor", "swift-org", "Concurrency", "Actor", "shared topic word"),
    )
    .await
    .unwrap();
    doc_index::ingest::index_document(
        &pool,
        &doc("apple-archive://Old/api", "apple-archive", "OldFramework", "Deprecated", "shared topic word"),
    )
    .await
    .unwrap();

    let opts = OrchestratorOptions::default();
    let teasers = orchestrator::fetch_teasers(&pool, None, "shared topic", "apple-docs", false, &opts).await;

    let sources: Vec<&str> = teasers.slots.iter().map(|s| s.source.as_str()).collect();
    assert!(!sources.contains(&"apple-docs"), "excluded source should not reappear as a teaser");
    assert!(!sources.contains(&"apple-archive"), "archive is excluded unless include_archive is set");
    assert!(sources.contains(&"swift-org"));
}

fn write_swift_project(root: &std::path::Path) {
    std::fs::create_dir_all(root.join("Sources")).unwrap();
    std::fs::write(root.join("README.md"), "Sample project readme.\n").unwrap();
    std::fs::write(
        root.join("Sources").join("Model.swift"),
        "import SwiftUI\nimport Combine\n\npublic struct ContentView: View {\n    public var body: some View {\n        Text(\"hi\")\n    }\n}\n",
    )
    .unwrap();
}

#[tokio::test]
async fn ingest_all_indexes_a_bare_directory_project_with_symbols_and_imports() {
    let dir = tempfile::tempdir().unwrap();
    let pool = sample_index::schema::connect(&dir.path().join("samples.db")).await.unwrap();

    let sample_code_root = dir.path().join("sample-code");
    write_swift_project(&sample_code_root.join("DemoApp"));

    let summary = sample_index::ingest::ingest_all(&pool, &sample_code_root, false).await.unwrap();
    assert_eq!(summary.projects_indexed, 1);
    assert_eq!(summary.files_indexed, 2);

    let projects = sample_index::search::search_projects(&pool, "readme", 10).await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, "DemoApp");
    assert!(projects[0].frameworks.contains(&"swiftui".to_string()));
    assert!(projects[0].frameworks.contains(&"combine".to_string()));

    let files = sample_index::search::search_files(&pool, "ContentView", None, 10).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].project_id, "DemoApp");

    let symbols = sample_index::search::search_symbols(&pool, "ContentView", 10).await.unwrap();
    assert!(!symbols.is_empty(), "ContentView struct should be indexed as a symbol");
}

#[tokio::test]
async fn reingesting_without_force_skips_an_already_indexed_project() {
    let dir = tempfile::tempdir().unwrap();
    let pool = sample_index::schema::connect(&dir.path().join("samples.db")).await.unwrap();

    let sample_code_root = dir.path().join("sample-code");
    write_swift_project(&sample_code_root.join("DemoApp"));

    sample_index::ingest::ingest_all(&pool, &sample_code_root, false).await.unwrap();
    let second = sample_index::ingest::ingest_all(&pool, &sample_code_root, false).await.unwrap();
    assert_eq!(second.projects_indexed, 0);
    assert_eq!(second.projects_skipped, 1);

    let forced = sample_index::ingest::ingest_all(&pool, &sample_code_root, true).await.unwrap();
    assert_eq!(forced.projects_indexed, 1);
}

#[tokio::test]
async fn deleting_a_project_cascades_to_files_and_fts_mirrors() {
    let dir = tempfile::tempdir().unwrap();
    let pool = sample_index::schema::connect(&dir.path().join("samples.db")).await.unwrap();

    let sample_code_root = dir.path().join("sample-code");
    write_swift_project(&sample_code_root.join("DemoApp"));
    sample_index::ingest::ingest_all(&pool, &sample_code_root, false).await.unwrap();

    sample_index::ingest::delete_project(&pool, "DemoApp").await.unwrap();

    let projects = sample_index::search::search_projects(&pool, "readme", 10).await.unwrap();
    assert!(projects.is_empty());
    let files = sample_index::search::search_files(&pool, "ContentView", None, 10).await.unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn unified_search_fans_out_into_the_sample_index() {
    let dir = tempfile::tempdir().unwrap();
    let docs_pool = doc_index::schema::connect(&dir.path().join("search.db")).await.unwrap();
    let samples_pool = sample_index::schema::connect(&dir.path().join("samples.db")).await.unwrap();

    let sample_code_root = dir.path().join("sample-code");
    write_swift_project(&sample_code_root.join("DemoApp"));
    sample_index::ingest::ingest_all(&samples_pool, &sample_code_root, false).await.unwrap();

    let opts = OrchestratorOptions::default();
    let filters = doc_index::search::SearchFilters { source: Some("samples".to_string()), ..Default::default() };
    let result = orchestrator::search(&docs_pool, Some(&samples_pool), "readme", &filters, None, &opts)
        .await
        .unwrap();
    assert_eq!(result.total_count, 1);
    assert_eq!(result.items[0].source, "samples");
    assert_eq!(result.items[0].uri, "samples://DemoApp");
}
