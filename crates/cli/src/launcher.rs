//! Auto-launching a debuggable Chrome.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{BridgeError, Result};

/// Starts a browser listening on a debugging port.
#[async_trait]
pub trait Launcher: Send + Sync {
	/// Spawns the browser detached and waits for it to come up.
	async fn launch(&self, port: u16) -> Result<()>;

	/// Command line a user can run to start the browser by hand.
	fn remedy_command(&self, port: u16) -> String;
}

/// Platform default Chrome location.
pub fn default_chrome_path() -> PathBuf {
	let path = if cfg!(target_os = "macos") {
		"/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"
	} else if cfg!(target_os = "windows") {
		r"C:\Program Files\Google\Chrome\Application\chrome.exe"
	} else {
		"google-chrome"
	};
	PathBuf::from(path)
}

/// Profile directory used for a launched browser, one per port.
pub fn profile_dir(port: u16) -> PathBuf {
	std::env::temp_dir().join(format!("chrome-cdp-{port}"))
}

/// Arguments passed to a launched browser.
pub fn launch_args(port: u16, profile: &Path) -> Vec<String> {
	vec![
		format!("--remote-debugging-port={port}"),
		format!("--user-data-dir={}", profile.display()),
		"--no-first-run".to_string(),
		"--no-default-browser-check".to_string(),
	]
}

/// Launches Chrome as a detached process.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
	chrome_path: PathBuf,
	startup_delay: Duration,
}

impl ChromeLauncher {
	pub fn new(chrome_path: PathBuf, startup_delay: Duration) -> Self {
		Self {
			chrome_path,
			startup_delay,
		}
	}
}

#[async_trait]
impl Launcher for ChromeLauncher {
	async fn launch(&self, port: u16) -> Result<()> {
		let args = launch_args(port, &profile_dir(port));
		tracing::info!(target = "scm.launcher", path = %self.chrome_path.display(), ?args, "launching chrome");

		let mut cmd = Command::new(&self.chrome_path);
		cmd.args(&args).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

		#[cfg(unix)]
		std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

		#[cfg(windows)]
		{
			const DETACHED_PROCESS: u32 = 0x0000_0008;
			const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
			std::os::windows::process::CommandExt::creation_flags(&mut cmd, DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
		}

		// The child is never waited on; it outlives this process.
		let child = cmd.spawn().map_err(|e| {
			BridgeError::Connection(format!("Failed to launch Chrome at {}: {e}", self.chrome_path.display()))
		})?;
		tracing::debug!(target = "scm.launcher", pid = child.id(), "chrome spawned");
		drop(child);

		tokio::time::sleep(self.startup_delay).await;
		Ok(())
	}

	fn remedy_command(&self, port: u16) -> String {
		format!("{} --remote-debugging-port={port}", self.chrome_path.display())
	}
}
