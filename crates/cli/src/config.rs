//! Resolved runtime configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::launcher::default_chrome_path;

pub const DEFAULT_PORT: u16 = 9222;
pub const DEFAULT_MAX_LOGS: usize = 500;
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_millis(2000);

/// Settings shared by the session, launcher and tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
	/// Port used when a tool call omits `port`.
	pub default_port: u16,
	/// Browser executable for auto-launch and the manual-launch hint.
	pub chrome_path: PathBuf,
	/// Wait between launching the browser and the retry connect.
	pub startup_delay: Duration,
	/// Capacity of each per-target log buffer.
	pub max_logs: usize,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			default_port: DEFAULT_PORT,
			chrome_path: default_chrome_path(),
			startup_delay: DEFAULT_STARTUP_DELAY,
			max_logs: DEFAULT_MAX_LOGS,
		}
	}
}
