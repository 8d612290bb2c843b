//! MCP JSON-RPC server (spec §4.7).
//!
//! A line-delimited stdio transport: request objects on stdin, response
//! objects on stdout, one per line. Never write non-protocol bytes to
//! stdout — startup guidance and all logging go to stderr via `tracing`
//! (see [`crate::progress::init_stderr_logging`]).
//!
//! Modeled directly on the teacher's `McpBridge` (`mcp.rs`): `list_tools`/
//! `call_tool` are thin adapters from the crate's own tool abstraction
//! ([`super::tools::ToolRegistry`]) onto `rmcp`'s `ServerHandler` trait.
//! Only the transport differs — stdio instead of streamable-HTTP — since
//! this server exposes tools only, no prompts/agents.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{transport::stdio, ErrorData as McpError, ServerHandler, ServiceExt};

use super::tools::ToolRegistry;

#[derive(Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry: Arc::new(registry) }
    }

    /// Run the protocol initialize/handshake, then serve until the
    /// transport closes (spec §4.7 "Lifecycle").
    pub async fn connect_stdio(self) -> anyhow::Result<()> {
        let service = self.serve(stdio()).await?;
        service.waiting().await?;
        Ok(())
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "cupertino".to_string(),
                title: Some("Cupertino".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Cupertino — local knowledge base of Apple platform documentation and sample \
                 code. Use search_docs/search_samples/search to query, list_frameworks/\
                 list_samples to browse, and read_document/read_sample/read_sample_file to \
                 fetch full content."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self.registry.tools().iter().map(|t| to_mcp_tool(t.as_ref())).collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.registry.find(name).map(|t| to_mcp_tool(t.as_ref()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool = self.registry.find(&request.name).ok_or_else(|| {
            McpError::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("no tool registered with name: {}", request.name),
                None,
            )
        })?;

        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        match tool.call(params).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_default();
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }
}

fn to_mcp_tool(tool: &dyn super::tools::McpTool) -> Tool {
    let input_schema: Arc<serde_json::Map<String, serde_json::Value>> = match tool.input_schema() {
        serde_json::Value::Object(map) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    };

    Tool {
        name: Cow::Borrowed(tool.name()),
        title: None,
        description: Some(Cow::Borrowed(tool.description())),
        input_schema,
        output_schema: None,
        annotations: Some(ToolAnnotations::new().read_only(true)),
        execution: None,
        icons: None,
        meta: None,
    }
}
