//! MCP Server implementation for Casement
//!
//! This module exposes the window geometry and process enumeration service
//! as Model Context Protocol tools. Tools speak in pids only; window handles
//! never leave the service.

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, serde,
    service::RequestContext,
    tool, tool_handler, tool_router, ErrorData as McpError, RoleServer, ServerHandler,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::core::types::{Pid, ProcessInfo};
use crate::error::ServiceError;
use crate::service::WindowService;

/// Parameters for get_window_info tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct GetWindowInfoParams {
    /// Process id from one of the listing tools
    pub pid: Pid,
}

/// Parameters for set_window_size tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SetWindowSizeParams {
    /// Process id whose primary window is resized
    pub pid: Pid,
    /// New width in pixels
    pub width: i32,
    /// New height in pixels
    pub height: i32,
}

/// Parameters for set_window_position tool
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SetWindowPositionParams {
    /// Process id whose primary window is moved
    pub pid: Pid,
    /// New X position in screen coordinates (may be negative)
    pub x: i32,
    /// New Y position in screen coordinates (may be negative)
    pub y: i32,
    /// New width in pixels
    pub width: i32,
    /// New height in pixels
    pub height: i32,
}

/// Casement MCP Server
#[derive(Clone)]
pub struct CasementServer {
    service: Arc<dyn WindowService>,
    /// MCP tool router
    tool_router: ToolRouter<CasementServer>,
}

fn success(value: Value) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(&value).map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Tool error body carrying the stable error kind
fn error_body(err: &ServiceError) -> Value {
    let mut body = json!({
        "error": err.kind(),
        "code": err.error_code(),
        "message": err.to_string(),
    });

    if let Some(pid) = err.pid() {
        body["pid"] = json!(pid);
    }
    if let ServiceError::InvalidGeometry {
        width,
        height,
        min_width,
        min_height,
    } = err
    {
        body["geometry"] = json!({ "width": width, "height": height });
        body["minimum"] = json!({ "width": min_width, "height": min_height });
    }

    body
}

fn failure(err: &ServiceError) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(error_body(err).to_string())]))
}

fn process_list(processes: &[ProcessInfo]) -> Value {
    json!({
        "processes": processes,
        "count": processes.len()
    })
}

#[tool_router]
impl CasementServer {
    pub fn new(service: Arc<dyn WindowService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List processes that own visible application windows. System and background processes are filtered out.")]
    async fn list_application_processes(&self) -> Result<CallToolResult, McpError> {
        match self.service.list_application_processes().await {
            Ok(processes) => success(process_list(&processes)),
            Err(e) => failure(&e),
        }
    }

    #[tool(description = "List every process owning at least one top-level window, visible or not. Use this to diagnose why a process is missing from list_application_processes.")]
    async fn list_all_processes_with_windows(&self) -> Result<CallToolResult, McpError> {
        match self.service.list_all_processes_with_windows().await {
            Ok(processes) => success(process_list(&processes)),
            Err(e) => failure(&e),
        }
    }

    #[tool(description = "Get the screen position and size of a process's primary window")]
    async fn get_window_info(
        &self,
        params: Parameters<GetWindowInfoParams>,
    ) -> Result<CallToolResult, McpError> {
        let pid = params.0.pid;
        match self.service.get_window_info(pid).await {
            Ok(geometry) => success(json!({
                "pid": pid,
                "x": geometry.x,
                "y": geometry.y,
                "width": geometry.width,
                "height": geometry.height
            })),
            Err(e) => failure(&e),
        }
    }

    #[tool(description = "Resize a process's primary window, keeping its top-left corner. Maximized or minimized windows are restored first.")]
    async fn set_window_size(
        &self,
        params: Parameters<SetWindowSizeParams>,
    ) -> Result<CallToolResult, McpError> {
        let SetWindowSizeParams { pid, width, height } = params.0;
        match self.service.set_window_size(pid, width, height).await {
            Ok(()) => success(json!({
                "success": true,
                "pid": pid,
                "width": width,
                "height": height
            })),
            Err(e) => failure(&e),
        }
    }

    #[tool(description = "Move and resize a process's primary window in one step. Coordinates are in screen space and may be negative on multi-monitor layouts.")]
    async fn set_window_position(
        &self,
        params: Parameters<SetWindowPositionParams>,
    ) -> Result<CallToolResult, McpError> {
        let SetWindowPositionParams {
            pid,
            x,
            y,
            width,
            height,
        } = params.0;
        match self.service.set_window_position(pid, x, y, width, height).await {
            Ok(()) => success(json!({
                "success": true,
                "pid": pid,
                "x": x,
                "y": y,
                "width": width,
                "height": height
            })),
            Err(e) => failure(&e),
        }
    }
}

#[tool_handler]
impl ServerHandler for CasementServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Casement reads and sets the position and size of application windows. \
                 Use list_application_processes to find a pid, then get_window_info, \
                 set_window_size or set_window_position on that pid. Every call works on \
                 fresh window state; a pid may fail with ProcessNotFound if the process exited.".to_string()
            ),
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        Ok(self.get_info())
    }
}
