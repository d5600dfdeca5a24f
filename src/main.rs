//! Casement - Window geometry and process enumeration MCP server
//!
//! Lists the processes that own application windows and reads or sets the
//! screen bounds of a process's primary window.

use std::sync::Arc;

use casement::config::Config;
use casement::core::desktop::{Desktop, DesktopSettings};
use casement::logging::init_logging;
use casement::process::SysinfoDirectory;
use casement::server::CasementServer;
use casement::service::GeometryService;
use rmcp::ServiceExt;
use rmcp::transport::io::stdio;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, config_error) = Config::load();

    // Initialize tracing (stderr to keep stdout clean for MCP protocol)
    init_logging(&config.log);

    if let Some(e) = config_error {
        tracing::warn!("{}; using default configuration", e);
    }

    tracing::info!("Starting Casement MCP Server");

    let backend = casement::backend::create_backend()?;
    let desktop = Desktop::new(
        backend,
        Arc::new(SysinfoDirectory),
        DesktopSettings::from_config(&config),
    );
    let service = GeometryService::new(desktop, config.call_timeout());

    let server = CasementServer::new(Arc::new(service));

    // Run with stdio transport
    let transport = stdio();

    tracing::info!("Casement MCP Server ready, listening on stdio");

    let service = server.serve(transport).await?;

    // Wait for graceful shutdown
    service.waiting().await?;

    tracing::info!("Casement MCP Server shutting down");
    Ok(())
}
