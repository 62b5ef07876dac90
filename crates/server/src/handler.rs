//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the subtitle pipeline.
use crate::tools::subtitle_fetch::{SubtitleFetchParams, fetch_impl};
use crate::tools::subtitles_search::{SubtitlesSearchParams, search_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use subdx_client::SubtitleService;

/// The main MCP server handler for subdx.
#[derive(Clone)]
pub struct SubdxServer {
    tool_router: ToolRouter<Self>,
    service: SubtitleService,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SubdxServer {
    /// Create a new server handler around the pipeline.
    pub fn new(service: SubtitleService) -> Self {
        Self { tool_router: Self::tool_router(), service }
    }

    /// Search Spanish subtitles for a movie or series episode.
    #[tool(
        description = "Search Spanish subtitles on subdivx for a movie or series episode by IMDb id. Returns subtitle ids ranked by how well they match the video filename."
    )]
    async fn subtitles_search(&self, params: Parameters<SubtitlesSearchParams>) -> Result<CallToolResult, McpError> {
        search_impl(&self.service, params.0).await
    }

    /// Download one subtitle and return its text.
    #[tool(
        description = "Download a subtitle by id (from subtitles_search), extract it from its archive and return the text as UTF-8."
    )]
    async fn subtitle_fetch(&self, params: Parameters<SubtitleFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.service, params.0).await
    }
}

impl ServerHandler for SubdxServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "subdx".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::service;

    #[tokio::test]
    async fn test_tools_are_registered() {
        let server = SubdxServer::new(service().await);
        let names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        assert!(names.contains(&"subtitles_search".to_string()));
        assert!(names.contains(&"subtitle_fetch".to_string()));
        assert_eq!(names.len(), 2);
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = SubdxServer::new(service().await);
        assert_eq!(server.get_info().server_info.name, "subdx");
    }
}
