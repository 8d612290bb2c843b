//! MCP tool dispatch tests against [`cupertino::mcp::tools::ToolRegistry`]
//! directly — no stdio transport involved, just the `McpTool::call` contract
//! each tool in the registry must satisfy.

use std::sync::Arc;

use chrono::Utc;
use cupertino::doc_index;
use cupertino::mcp::tools::{ToolContext, ToolRegistry};
use cupertino::models::{Document, PlatformAvailability};
use cupertino::sample_index;
use cupertino::unified::orchestrator::OrchestratorOptions;
use serde_json::json;

async fn seeded_docs_pool(dir: &tempfile::TempDir) -> sqlx::SqlitePool {
    let pool = doc_index::schema::connect(&dir.path().join("search.db")).await.unwrap();
    doc_index::ingest::index_document(
        &pool,
        &Document {
            uri: "apple-docs://SwiftUI/view".to_string(),
            source: "apple-docs".to_string(),
            framework: "SwiftUI".to_string(),
            language: None,
            title: "View".to_string(),
            content: "A type that represents part of your app's user interface.".to_string(),
            summary: "A type that represents part of your app's user interface.".to_string(),
            summary_truncated: false,
            file_path: "/tmp/view.md".to_string(),
            content_hash: "h".to_string(),
            last_crawled: Utc::now(),
            json_data: None,
            availability: PlatformAvailability::default(),
        },
    )
    .await
    .unwrap();
    pool
}

#[tokio::test]
async fn registry_omits_doc_tools_when_docs_pool_is_absent() {
    let ctx = ToolContext { docs_pool: None, samples_pool: None, orchestrator_opts: Arc::new(OrchestratorOptions::default()) };
    let registry = ToolRegistry::build(ctx);
    assert!(registry.find("search_docs").is_none());
    assert!(registry.find("list_frameworks").is_none());
    assert!(registry.tools().is_empty());
}

#[tokio::test]
async fn search_docs_tool_returns_matching_results() {
    let dir = tempfile::tempdir().unwrap();
    let pool = seeded_docs_pool(&dir).await;
    let ctx = ToolContext { docs_pool: Some(pool), samples_pool: None, orchestrator_opts: Arc::new(OrchestratorOptions::default()) };
    let registry = ToolRegistry::build(ctx);

    let tool = registry.find("search_docs").expect("search_docs should be registered");
    let result = tool.call(json!({ "query": "interface" })).await.unwrap();
    let results = result["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["title"], "View");
}

#[tokio::test]
async fn search_docs_tool_rejects_empty_query() {
    let dir = tempfile::tempdir().unwrap();
    let pool = seeded_docs_pool(&dir).await;
    let ctx = ToolContext { docs_pool: Some(pool), samples_pool: None, orchestrator_opts: Arc::new(OrchestratorOptions::default()) };
    let registry = ToolRegistry::build(ctx);

    let tool = registry.find("search_docs").unwrap();
    let err = tool.call(json!({})).await.unwrap_err();
    assert!(matches!(err, cupertino::errors::CupertinoError::InvalidQuery(_)));
}

#[tokio::test]
async fn read_document_tool_reports_not_found_for_unknown_uri() {
    let dir = tempfile::tempdir().unwrap();
    let pool = seeded_docs_pool(&dir).await;
    let ctx = ToolContext { docs_pool: Some(pool), samples_pool: None, orchestrator_opts: Arc::new(OrchestratorOptions::default()) };
    let registry = ToolRegistry::build(ctx);

    let tool = registry.find("read_document").unwrap();
    let err = tool.call(json!({ "uri": "apple-docs://Nope/missing" })).await.unwrap_err();
    assert!(matches!(err, cupertino::errors::CupertinoError::NotFound(_)));
}

#[tokio::test]
async fn list_frameworks_tool_reports_ingested_frameworks() {
    let dir = tempfile::tempdir().unwrap();
    let pool = seeded_docs_pool(&dir).await;
    let ctx = ToolContext { docs_pool: Some(pool), samples_pool: None, orchestrator_opts: Arc::new(OrchestratorOptions::default()) };
    let registry = ToolRegistry::build(ctx);

    let tool = registry.find("list_frameworks").unwrap();
    let result = tool.call(json!({})).await.unwrap();
    let frameworks = result.as_array().unwrap();
    assert_eq!(frameworks.len(), 1);
    assert_eq!(frameworks[0]["framework"], "SwiftUI");
}

#[tokio::test]
async fn search_samples_tool_returns_project_and_file_hits() {
    let dir = tempfile::tempdir().unwrap();
    let pool = sample_index::schema::connect(&dir.path().join("samples.db")).await.unwrap();
    let sample_code_root = dir.path().join("sample-code");
    let project_dir = sample_code_root.join("DemoApp");
    std::fs::create_dir_all(&project_dir).unwrap();
    std::fs::write(project_dir.join("README.md"), "Demo app readme.\n").unwrap();
    sample_index::ingest::ingest_all(&pool, &sample_code_root, false).await.unwrap();

    let ctx = ToolContext { docs_pool: None, samples_pool: Some(pool), orchestrator_opts: Arc::new(OrchestratorOptions::default()) };
    let registry = ToolRegistry::build(ctx);
    assert!(registry.find("search_docs").is_none(), "doc tools absent without a docs pool");

    let tool = registry.find("search_samples").unwrap();
    let result = tool.call(json!({ "query": "readme", "searchFiles": true })).await.unwrap();
    let projects = result["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["id"], "DemoApp");
}

#[tokio::test]
async fn read_sample_tool_reports_not_found_for_unknown_project() {
    let dir = tempfile::tempdir().unwrap();
    let pool = sample_index::schema::connect(&dir.path().join("samples.db")).await.unwrap();
    let ctx = ToolContext { docs_pool: None, samples_pool: Some(pool), orchestrator_opts: Arc::new(OrchestratorOptions::default()) };
    let registry = ToolRegistry::build(ctx);

    let tool = registry.find("read_sample").unwrap();
    let err = tool.call(json!({ "projectId": "DoesNotExist" })).await.unwrap_err();
    assert!(matches!(err, cupertino::errors::CupertinoError::NotFound(_)));
}
