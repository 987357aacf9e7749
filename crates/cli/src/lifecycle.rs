//! Process lifetime: serve until end of input or a termination signal,
//! then tear the session down exactly once.

use std::future::Future;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::server::McpServer;

/// Exit status after end of input or a signal.
pub const EXIT_OK: i32 = 0;
/// Exit status after an uncaught failure.
pub const EXIT_FAILURE: i32 = 1;

/// Resolves with the signal's name on SIGINT or SIGTERM.
#[cfg(unix)]
pub async fn shutdown_signal() -> Result<&'static str> {
	use tokio::signal::unix::{SignalKind, signal};

	let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
	let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

	tokio::select! {
		_ = sigterm.recv() => Ok("SIGTERM"),
		_ = sigint.recv() => Ok("SIGINT"),
	}
}

/// Resolves on Ctrl+C.
#[cfg(not(unix))]
pub async fn shutdown_signal() -> Result<&'static str> {
	tokio::signal::ctrl_c().await.context("Failed to install Ctrl+C handler")?;
	Ok("Ctrl+C")
}

/// Serves `server` over the given streams and returns the exit status.
///
/// Cleanup runs on every path out.
pub async fn run<R, W>(server: McpServer, reader: R, writer: W) -> i32
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin + Send + 'static,
{
	run_until(server, reader, writer, async {
		match shutdown_signal().await {
			Ok(name) => name,
			Err(err) => {
				tracing::warn!(target = "scm.lifecycle", error = %err, "signals unavailable");
				std::future::pending().await
			}
		}
	})
	.await
}

/// Like [`run`], with `signal` standing in for the OS signal handlers.
pub async fn run_until<R, W, S>(server: McpServer, reader: R, writer: W, signal: S) -> i32
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin + Send + 'static,
	S: Future<Output = &'static str>,
{
	let session = std::sync::Arc::clone(server.session());

	let code = tokio::select! {
		result = server.serve(reader, writer) => match result {
			Ok(()) => EXIT_OK,
			Err(err) => {
				tracing::error!(target = "scm.lifecycle", error = ?err, "fatal error");
				eprintln!("[simple-console-mcp] Fatal error: {err:#}");
				EXIT_FAILURE
			}
		},
		name = signal => {
			tracing::info!(target = "scm.lifecycle", signal = name, "received signal, shutting down");
			EXIT_OK
		}
	};

	session.cleanup();
	code
}
