//! MCP tool implementations (spec §4.7 "Tools exported").
//!
//! Each tool is a small struct implementing [`McpTool`]; [`ToolRegistry`]
//! builds a `{name → handler}` map at startup from whichever providers
//! (doc index, sample index) actually opened. A tool whose backing index
//! is missing is simply absent from the registry rather than returning a
//! runtime error — mirroring the teacher's `ToolRegistry`/`find` pattern
//! in `mcp.rs`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::doc_index::search::SearchFilters;
use crate::errors::CupertinoError;
use crate::sample_index;
use crate::unified::format::{format_result, OutputFormat};
use crate::unified::orchestrator::{self, OrchestratorOptions};

#[async_trait]
pub trait McpTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;
    async fn call(&self, params: Value) -> Result<Value, CupertinoError>;
}

/// Shared state handed to every tool: the two optional index pools plus
/// orchestrator defaults. A pool is `None` when its index file does not
/// exist or failed to open.
#[derive(Clone)]
pub struct ToolContext {
    pub docs_pool: Option<SqlitePool>,
    pub samples_pool: Option<SqlitePool>,
    pub orchestrator_opts: Arc<OrchestratorOptions>,
}

pub struct ToolRegistry {
    tools: Vec<Arc<dyn McpTool>>,
}

impl ToolRegistry {
    /// Build the registry from whichever providers could load. Tools that
    /// need an index that isn't present are omitted entirely.
    pub fn build(ctx: ToolContext) -> Self {
        let mut tools: Vec<Arc<dyn McpTool>> = Vec::new();

        if ctx.docs_pool.is_some() {
            tools.push(Arc::new(SearchDocsTool { ctx: ctx.clone() }));
            tools.push(Arc::new(ListFrameworksTool { ctx: ctx.clone() }));
            tools.push(Arc::new(ReadDocumentTool { ctx: ctx.clone() }));
            tools.push(Arc::new(SearchTool { ctx: ctx.clone() }));
        }
        if ctx.samples_pool.is_some() {
            tools.push(Arc::new(SearchSamplesTool { ctx: ctx.clone() }));
            tools.push(Arc::new(ListSamplesTool { ctx: ctx.clone() }));
            tools.push(Arc::new(ReadSampleTool { ctx: ctx.clone() }));
            tools.push(Arc::new(ReadSampleFileTool { ctx: ctx.clone() }));
        }

        Self { tools }
    }

    pub fn tools(&self) -> &[Arc<dyn McpTool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<Arc<dyn McpTool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }
}

fn string_param(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn bool_param(params: &Value, key: &str, default: bool) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

fn int_param(params: &Value, key: &str) -> Option<i64> {
    params.get(key).and_then(|v| v.as_i64())
}

fn filters_from_params(params: &Value) -> SearchFilters {
    SearchFilters {
        source: string_param(params, "source"),
        framework: string_param(params, "framework"),
        language: string_param(params, "language"),
        include_archive: bool_param(params, "includeArchive", false),
        min_ios: string_param(params, "minIOS"),
        min_macos: string_param(params, "minMacOS"),
        min_tvos: string_param(params, "minTvOS"),
        min_watchos: string_param(params, "minWatchOS"),
        min_visionos: string_param(params, "minVisionOS"),
    }
}

// ── search_docs ──────────────────────────────────────────────────────────

pub struct SearchDocsTool {
    ctx: ToolContext,
}

#[async_trait]
impl McpTool for SearchDocsTool {
    fn name(&self) -> &'static str {
        "search_docs"
    }

    fn description(&self) -> &'static str {
        "Search Apple platform documentation by keyword, with optional source/framework/language/platform-minimum filters."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "source": {"type": "string"},
                "framework": {"type": "string"},
                "language": {"type": "string"},
                "limit": {"type": "integer"},
                "includeArchive": {"type": "boolean"},
                "minIOS": {"type": "string"},
                "minMacOS": {"type": "string"},
                "minTvOS": {"type": "string"},
                "minWatchOS": {"type": "string"},
                "minVisionOS": {"type": "string"}
            },
            "required": ["query"]
        })
    }

    async fn call(&self, params: Value) -> Result<Value, CupertinoError> {
        let query = string_param(&params, "query")
            .ok_or_else(|| CupertinoError::InvalidQuery("query is required".to_string()))?;
        let filters = filters_from_params(&params);
        let limit = int_param(&params, "limit").unwrap_or(12);

        let pool = self.ctx.docs_pool.as_ref().expect("registered only when docs_pool is Some");
        let items = crate::doc_index::search::search(pool, &query, &filters, limit)
            .await
            .map_err(|e| CupertinoError::PersistenceError(e.to_string()))?;

        let text = items
            .iter()
            .map(|i| format!("{} ({}/{}) — {}", i.title, i.source, i.framework, i.summary))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(json!({ "text": text, "results": items }))
    }
}

// ── list_frameworks ──────────────────────────────────────────────────────

pub struct ListFrameworksTool {
    ctx: ToolContext,
}

#[async_trait]
impl McpTool for ListFrameworksTool {
    fn name(&self) -> &'static str {
        "list_frameworks"
    }

    fn description(&self) -> &'static str {
        "List every framework present in the doc index with its document count."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _params: Value) -> Result<Value, CupertinoError> {
        let pool = self.ctx.docs_pool.as_ref().expect("registered only when docs_pool is Some");
        let frameworks = crate::doc_index::search::list_frameworks(pool)
            .await
            .map_err(|e| CupertinoError::PersistenceError(e.to_string()))?;
        Ok(json!(frameworks))
    }
}

// ── read_document ────────────────────────────────────────────────────────

pub struct ReadDocumentTool {
    ctx: ToolContext,
}

#[async_trait]
impl McpTool for ReadDocumentTool {
    fn name(&self) -> &'static str {
        "read_document"
    }

    fn description(&self) -> &'static str {
        "Fetch the raw content of a document by its URI."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "uri": {"type": "string"}, "format": {"type": "string"} },
            "required": ["uri"]
        })
    }

    async fn call(&self, params: Value) -> Result<Value, CupertinoError> {
        let uri = string_param(&params, "uri")
            .ok_or_else(|| CupertinoError::InvalidQuery("uri is required".to_string()))?;
        let format = string_param(&params, "format").unwrap_or_else(|| "markdown".to_string());

        let pool = self.ctx.docs_pool.as_ref().expect("registered only when docs_pool is Some");
        let record = crate::doc_index::search::read_document(pool, &uri)
            .await
            .map_err(|e| CupertinoError::PersistenceError(e.to_string()))?
            .ok_or_else(|| CupertinoError::NotFound(uri.clone()))?;

        let (content, json_data) = record;
        let body = if format == "json" {
            json_data.unwrap_or(content)
        } else {
            content
        };
        Ok(json!({ "uri": uri, "content": body }))
    }
}

// ── search_samples ───────────────────────────────────────────────────────

pub struct SearchSamplesTool {
    ctx: ToolContext,
}

#[async_trait]
impl McpTool for SearchSamplesTool {
    fn name(&self) -> &'static str {
        "search_samples"
    }

    fn description(&self) -> &'static str {
        "Search indexed sample-code projects, optionally including per-file snippet hits."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "framework": {"type": "string"},
                "searchFiles": {"type": "boolean"},
                "limit": {"type": "integer"}
            },
            "required": ["query"]
        })
    }

    async fn call(&self, params: Value) -> Result<Value, CupertinoError> {
        let query = string_param(&params, "query")
            .ok_or_else(|| CupertinoError::InvalidQuery("query is required".to_string()))?;
        let limit = int_param(&params, "limit").unwrap_or(12);
        let search_files = bool_param(&params, "searchFiles", false);

        let pool = self.ctx.samples_pool.as_ref().expect("registered only when samples_pool is Some");
        let projects = sample_index::search::search_projects(pool, &query, limit)
            .await
            .map_err(|e| CupertinoError::PersistenceError(e.to_string()))?;

        let files = if search_files {
            sample_index::search::search_files(pool, &query, None, limit)
                .await
                .map_err(|e| CupertinoError::PersistenceError(e.to_string()))?
        } else {
            Vec::new()
        };

        Ok(json!({ "projects": projects, "files": files }))
    }
}

// ── list_samples ─────────────────────────────────────────────────────────

pub struct ListSamplesTool {
    ctx: ToolContext,
}

#[async_trait]
impl McpTool for ListSamplesTool {
    fn name(&self) -> &'static str {
        "list_samples"
    }

    fn description(&self) -> &'static str {
        "List indexed sample-code projects, optionally filtered by framework."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "framework": {"type": "string"}, "limit": {"type": "integer"} }
        })
    }

    async fn call(&self, params: Value) -> Result<Value, CupertinoError> {
        let limit = int_param(&params, "limit").unwrap_or(50);
        let framework = string_param(&params, "framework");

        let pool = self.ctx.samples_pool.as_ref().expect("registered only when samples_pool is Some");
        let mut projects = sample_index::search::search_projects(pool, "*", limit)
            .await
            .unwrap_or_default();
        if let Some(fw) = framework {
            projects.retain(|p| p.frameworks.iter().any(|f| f.eq_ignore_ascii_case(&fw)));
        }
        Ok(json!(projects))
    }
}

// ── read_sample ──────────────────────────────────────────────────────────

pub struct ReadSampleTool {
    ctx: ToolContext,
}

#[async_trait]
impl McpTool for ReadSampleTool {
    fn name(&self) -> &'static str {
        "read_sample"
    }

    fn description(&self) -> &'static str {
        "Fetch the README of an indexed sample-code project."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "projectId": {"type": "string"} },
            "required": ["projectId"]
        })
    }

    async fn call(&self, params: Value) -> Result<Value, CupertinoError> {
        let project_id = string_param(&params, "projectId")
            .ok_or_else(|| CupertinoError::InvalidQuery("projectId is required".to_string()))?;

        let pool = self.ctx.samples_pool.as_ref().expect("registered only when samples_pool is Some");
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT readme FROM projects WHERE id = ?")
                .bind(&project_id)
                .fetch_optional(pool)
                .await
                .map_err(|e| CupertinoError::PersistenceError(e.to_string()))?;

        let readme = row
            .and_then(|(readme,)| readme)
            .ok_or_else(|| CupertinoError::NotFound(project_id.clone()))?;
        Ok(json!({ "projectId": project_id, "readme": readme }))
    }
}

// ── read_sample_file ─────────────────────────────────────────────────────

pub struct ReadSampleFileTool {
    ctx: ToolContext,
}

#[async_trait]
impl McpTool for ReadSampleFileTool {
    fn name(&self) -> &'static str {
        "read_sample_file"
    }

    fn description(&self) -> &'static str {
        "Fetch the body of a single file within an indexed sample-code project."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "projectId": {"type": "string"}, "path": {"type": "string"} },
            "required": ["projectId", "path"]
        })
    }

    async fn call(&self, params: Value) -> Result<Value, CupertinoError> {
        let project_id = string_param(&params, "projectId")
            .ok_or_else(|| CupertinoError::InvalidQuery("projectId is required".to_string()))?;
        let path = string_param(&params, "path")
            .ok_or_else(|| CupertinoError::InvalidQuery("path is required".to_string()))?;

        let pool = self.ctx.samples_pool.as_ref().expect("registered only when samples_pool is Some");
        let content = sample_index::search::read_file(pool, &project_id, &path)
            .await?
            .ok_or_else(|| CupertinoError::NotFound(format!("{project_id}:{path}")))?;
        Ok(json!({ "projectId": project_id, "path": path, "content": content }))
    }
}

// ── search (unified orchestrator) ───────────────────────────────────────

pub struct SearchTool {
    ctx: ToolContext,
}

#[async_trait]
impl McpTool for SearchTool {
    fn name(&self) -> &'static str {
        "search"
    }

    fn description(&self) -> &'static str {
        "Unified search: routes to a single source or fans out across every source and merges."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "source": {"type": "string"},
                "framework": {"type": "string"},
                "limit": {"type": "integer"},
                "format": {"type": "string"}
            },
            "required": ["query"]
        })
    }

    async fn call(&self, params: Value) -> Result<Value, CupertinoError> {
        let query = string_param(&params, "query")
            .ok_or_else(|| CupertinoError::InvalidQuery("query is required".to_string()))?;
        let filters = filters_from_params(&params);
        let limit = int_param(&params, "limit");
        let format: OutputFormat = string_param(&params, "format")
            .unwrap_or_else(|| "markdown".to_string())
            .parse()
            .unwrap_or(OutputFormat::Markdown);

        let pool = self.ctx.docs_pool.as_ref().expect("registered only when docs_pool is Some");
        let result = orchestrator::search(
            pool,
            self.ctx.samples_pool.as_ref(),
            &query,
            &filters,
            limit,
            &self.ctx.orchestrator_opts,
        )
        .await
        .map_err(|e| CupertinoError::PersistenceError(e.to_string()))?;

        Ok(json!({ "text": format_result(&result, format), "result": result }))
    }
}
