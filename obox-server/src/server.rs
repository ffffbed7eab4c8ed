// obox-server/src/server.rs

use crate::tools;
use obox_core::OboxConfig;
use rmcp::{model::*, service::*, Error as McpError};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

const INSTRUCTIONS: &str = "Wraps command-line developer tools: ripgrep search, fd file lookup, \
bat file reading, fzf filtering, project root discovery, Node.js (fnm, pnpm) and \
Python (uv) project management, and package installation through Homebrew (macOS) \
or Scoop (Windows). Node.js tools ask for 'root_dir' when several package.json \
projects are found. Every tool returns plain text; failures \
are described in the text rather than raised.";

#[derive(Debug, Clone)]
pub struct OboxServer {
    peer: Arc<Mutex<Option<Peer<RoleServer>>>>,
    tools: Arc<HashMap<String, Tool>>,
    config: Arc<OboxConfig>,
}

impl OboxServer {
    pub fn new(config: OboxConfig) -> Self {
        let tools = tools::definitions()
            .into_iter()
            .map(|tool| (tool.name.to_string(), tool))
            .collect();
        Self {
            peer: Arc::new(Mutex::new(None)),
            tools: Arc::new(tools),
            config: Arc::new(config),
        }
    }

    async fn handle_tool_call(&self, params: CallToolRequestParam) -> Result<CallToolResult, McpError> {
        let args_map = params.arguments.unwrap_or_default();
        debug!(tool = %params.name, "Tool call received");
        match tools::call(params.name.as_ref(), &args_map, &self.config).await? {
            Some(text) => Ok(tools::text_result(text)),
            None => {
                warn!(tool = %params.name, "Unknown tool requested");
                Err(McpError::method_not_found::<CallToolRequestMethod>())
            }
        }
    }
}

impl Service<RoleServer> for OboxServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                ..Default::default()
            },
            server_info: Implementation {
                name: "obox-server".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            instructions: Some(INSTRUCTIONS.into()),
        }
    }

    fn get_peer(&self) -> Option<Peer<RoleServer>> {
        self.peer.lock().ok().and_then(|guard| guard.clone())
    }

    fn set_peer(&mut self, peer: Peer<RoleServer>) {
        if let Ok(mut guard) = self.peer.lock() {
            *guard = Some(peer);
        }
    }

    #[allow(refining_impl_trait)]
    fn handle_request(
        &self,
        request: ClientRequest,
        _context: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<ServerResult, McpError>> + Send + '_>> {
        let self_clone = self.clone();
        Box::pin(async move {
            match request {
                ClientRequest::ListToolsRequest(Request { .. }) => {
                    let mut tools: Vec<Tool> = self_clone.tools.values().cloned().collect();
                    tools.sort_by(|a, b| a.name.cmp(&b.name));
                    Ok(ServerResult::ListToolsResult(ListToolsResult {
                        tools,
                        next_cursor: None,
                    }))
                }
                ClientRequest::CallToolRequest(Request { params, .. }) => self_clone
                    .handle_tool_call(params)
                    .await
                    .map(ServerResult::CallToolResult),
                _ => Err(McpError::method_not_found::<InitializeResultMethod>()),
            }
        })
    }

    #[allow(refining_impl_trait)]
    fn handle_notification(
        &self,
        _notification: ClientNotification,
    ) -> Pin<Box<dyn Future<Output = Result<(), McpError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn get_text(result: &CallToolResult) -> String {
        result
            .content
            .first()
            .map(|annotated| match &annotated.raw {
                RawContent::Text(t) => t.text.clone(),
                _ => String::new(),
            })
            .unwrap_or_default()
    }

    fn params(name: &str, arguments: Value) -> CallToolRequestParam {
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            _ => None,
        };
        CallToolRequestParam {
            name: name.to_string().into(),
            arguments,
        }
    }

    #[test]
    fn test_server_info() {
        let server = OboxServer::new(OboxConfig::default());
        let info = Service::get_info(&server);
        assert_eq!(info.server_info.name, "obox-server");
        assert!(info.capabilities.tools.is_some());
        assert_eq!(server.tools.len(), tools::definitions().len());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_method_not_found() {
        let server = OboxServer::new(OboxConfig::default());
        let result = server.handle_tool_call(params("nope", json!({}))).await;
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_round_trip() {
        let server = OboxServer::new(OboxConfig::default());
        let result = server
            .handle_tool_call(params("run_command", json!({ "command": ["echo", "hello", "obox"] })))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
        assert_eq!(get_text(&result), "hello obox");
    }

    #[tokio::test]
    async fn test_missing_arguments_default_to_empty_map() {
        let server = OboxServer::new(OboxConfig::default());
        let call = CallToolRequestParam {
            name: "find_project_root".into(),
            arguments: None::<Map<String, Value>>,
        };
        assert!(server.handle_tool_call(call).await.is_err());
    }
}
