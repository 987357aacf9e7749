
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::builder::TypedValueParser;

use crate::config::{BridgeConfig, DEFAULT_MAX_LOGS, DEFAULT_PORT};
use crate::launcher::default_chrome_path;
use crate::validate::parse_port;

/// MCP server that reads Chrome console logs over the DevTools protocol.
///
/// Speaks newline-delimited JSON-RPC on stdin/stdout. Diagnostics go to stderr.
#[derive(Parser, Debug)]
#[command(name = "simple-console-mcp")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Debugging port used when a tool call does not name one
	#[arg(long, env = "SCM_DEFAULT_PORT", default_value_t = DEFAULT_PORT, value_parser = parse_port)]
	pub default_port: u16,

	/// Chrome executable for auto-launch (defaults to the platform's usual location)
	#[arg(long, env = "CHROME_PATH", value_name = "PATH")]
	pub chrome_path: Option<PathBuf>,

	/// Milliseconds to wait after launching Chrome before reconnecting
	#[arg(long, env = "SCM_STARTUP_DELAY_MS", default_value_t = 2000, value_name = "MS")]
	pub startup_delay_ms: u64,

	/// Console entries kept per target
	#[arg(
		long,
		env = "SCM_MAX_LOGS",
		default_value_t = DEFAULT_MAX_LOGS,
		value_parser = clap::value_parser!(u64).range(1..).map(|v| v as usize)
	)]
	pub max_logs: usize,
}

impl Cli {
	pub fn into_config(self) -> BridgeConfig {
		BridgeConfig {
			default_port: self.default_port,
			chrome_path: self.chrome_path.unwrap_or_else(default_chrome_path),
			startup_delay: Duration::from_millis(self.startup_delay_ms),
			max_logs: self.max_logs,
		}
	}
}
