//! MCP bridge exposing Chrome console logs, targets and navigation over stdio.

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod launcher;
pub mod lifecycle;
pub mod logging;
pub mod server;
pub mod session;
pub mod tools;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use browser::cdp::CdpConnector;
use config::BridgeConfig;
use launcher::ChromeLauncher;
use server::McpServer;
use session::Session;
use tools::ToolRegistry;

/// Serves MCP on stdin/stdout against a real browser; returns the exit status.
pub async fn run_stdio(config: BridgeConfig) -> i32 {
	tracing::info!(
		target = "scm.lifecycle",
		default_port = config.default_port,
		chrome = %config.chrome_path.display(),
		max_logs = config.max_logs,
		"starting"
	);
	let launcher = ChromeLauncher::new(config.chrome_path.clone(), config.startup_delay);
	let session = Session::new(config, Arc::new(CdpConnector), Arc::new(launcher));
	let server = McpServer::new(ToolRegistry::new(Arc::new(session)));
	lifecycle::run(server, tokio::io::stdin(), tokio::io::stdout()).await
}
