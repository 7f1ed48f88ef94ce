use super::handlers;
use super::tooling::{schema_to_object_map, tool_catalog, WEB_SEARCH_TOOL};
use crate::AppState;
use rmcp::{model::*, ServiceExt};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct McpService {
    pub state: Arc<AppState>,
}

impl McpService {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }
}

impl rmcp::ServerHandler for McpService {
    fn get_info(&self) -> ServerInfo {
        let server_info = Implementation::from_build_env()
            .with_title("Scout Search MCP")
            .with_description(
                "Browser-driven web search that visits each result and returns its readable content as Markdown.",
            );
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::LATEST)
            .with_server_info(server_info)
            .with_instructions(
                "Call web_search with a query to get the main content of the top results. Use excludeDomains to skip sites and resultLimit to control how many pages are read.",
            )
    }

    async fn list_tools(
        &self,
        _page: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = tool_catalog()
            .into_iter()
            .map(|entry| {
                Tool::new(
                    entry.name,
                    entry.description,
                    schema_to_object_map(&entry.input_schema),
                )
                .with_title(entry.title)
            })
            .collect();

        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        info!("MCP tool call: {}", request.name);

        match request.name.as_ref() {
            WEB_SEARCH_TOOL => {
                handlers::web_search::handle(Arc::clone(&self.state), request.arguments.as_ref())
                    .await
            }
            _ => Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Unknown tool: {}", request.name),
                None,
            )),
        }
    }
}

/// Serve MCP over stdin/stdout until the client disconnects.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    info!("Starting MCP stdio server");
    let service = McpService::new(state);
    let running = service.serve(rmcp::transport::stdio()).await?;
    info!("MCP stdio server initialized; waiting for client session");
    let quit_reason = running.waiting().await?;
    warn!("MCP stdio server stopped: {:?}", quit_reason);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::ServerHandler;

    #[test]
    fn server_info_advertises_tools() {
        let info = McpService::new(AppState::new(crate::core::config::SearchConfig::default())).get_info();
        assert!(info.capabilities.tools.is_some());
        assert_eq!(info.server_info.title.as_deref(), Some("Scout Search MCP"));
        assert!(info.instructions.unwrap_or_default().contains("web_search"));
    }
}
