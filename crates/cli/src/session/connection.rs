//! The single browser connection and its connect-or-launch attempt.
//!
//! At most one connection is live and at most one attempt is in flight.
//! The attempt is a shared future: the first caller installs it, later
//! callers await a clone of it, and the attempt clears its own slot before
//! yielding its result.
//!
//! Background task panics of every connection made are funneled into one
//! channel that outlives reconnects.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use scm::TaskFailure;
use tokio::sync::broadcast;

use crate::browser::{BrowserLike, Connector};
use crate::error::{BridgeError, Result};
use crate::launcher::Launcher;
use crate::validate::check_port;

const FAILURE_CAPACITY: usize = 16;

type Attempt = Shared<BoxFuture<'static, Result<Arc<dyn BrowserLike>>>>;

#[derive(Default)]
struct State {
	live: Option<Arc<dyn BrowserLike>>,
	pending: Option<Attempt>,
	closed: bool,
}

impl State {
	fn live(&self) -> Option<Arc<dyn BrowserLike>> {
		self.live.as_ref().filter(|browser| browser.is_connected()).cloned()
	}
}

/// Owns the process-wide browser connection.
pub struct ConnectionManager {
	connector: Arc<dyn Connector>,
	launcher: Arc<dyn Launcher>,
	state: Arc<Mutex<State>>,
	failures: broadcast::Sender<TaskFailure>,
}

impl ConnectionManager {
	pub fn new(connector: Arc<dyn Connector>, launcher: Arc<dyn Launcher>) -> Self {
		let (failures, _) = broadcast::channel(FAILURE_CAPACITY);
		Self {
			connector,
			launcher,
			state: Arc::default(),
			failures,
		}
	}

	/// Background task panics from any connection established after this call.
	pub fn task_failures(&self) -> broadcast::Receiver<TaskFailure> {
		self.failures.subscribe()
	}

	/// Returns the live connection, establishing one if needed.
	///
	/// Concurrent callers share one attempt, so a failed connect launches at
	/// most one browser. A caller naming a different port while an attempt
	/// is in flight gets that attempt's result.
	pub async fn ensure(&self, port: u16) -> Result<Arc<dyn BrowserLike>> {
		let port = check_port(port)?;
		let attempt = {
			let mut state = self.state.lock();
			if state.closed {
				return Err(shutting_down());
			}
			if let Some(browser) = state.live() {
				return Ok(browser);
			}
			match &state.pending {
				Some(attempt) => {
					tracing::debug!(target = "scm.session", port, "joining in-flight connection attempt");
					attempt.clone()
				}
				None => {
					let attempt = self.start_attempt(port);
					state.pending = Some(attempt.clone());
					attempt
				}
			}
		};
		attempt.await
	}

	/// Current live connection, if any.
	pub fn live(&self) -> Option<Arc<dyn BrowserLike>> {
		self.state.lock().live()
	}

	/// Disconnects and refuses further attempts.
	pub fn close(&self) {
		let live = {
			let mut state = self.state.lock();
			state.closed = true;
			state.pending = None;
			state.live.take()
		};
		if let Some(browser) = live {
			browser.disconnect();
			tracing::debug!(target = "scm.session", "browser disconnected");
		}
	}

	fn start_attempt(&self, port: u16) -> Attempt {
		let connector = Arc::clone(&self.connector);
		let launcher = Arc::clone(&self.launcher);
		let state = Arc::clone(&self.state);
		let failures = self.failures.clone();

		async move {
			let result = connect_or_launch(connector.as_ref(), launcher.as_ref(), &state, port).await;

			let mut guard = state.lock();
			guard.pending = None;
			let browser = result?;
			if guard.closed {
				drop(guard);
				browser.disconnect();
				return Err(shutting_down());
			}
			guard.live = Some(Arc::clone(&browser));
			tokio::spawn(forward_failures(browser.task_failures(), failures));
			Ok(browser)
		}
		.boxed()
		.shared()
	}
}

async fn connect_or_launch(
	connector: &dyn Connector,
	launcher: &dyn Launcher,
	state: &Mutex<State>,
	port: u16,
) -> Result<Arc<dyn BrowserLike>> {
	if let Some(browser) = state.lock().live() {
		return Ok(browser);
	}

	let endpoint = format!("http://localhost:{port}");
	match connector.connect(&endpoint).await {
		Ok(browser) => {
			tracing::info!(target = "scm.session", %endpoint, "connected to existing browser");
			return Ok(browser);
		}
		Err(err) => tracing::info!(target = "scm.session", %endpoint, error = %err, "no browser, launching one"),
	}

	let failure = || {
		BridgeError::Connection(format!(
			"Cannot connect to Chrome CDP (port {port}).\nAuto-launch failed. Please start Chrome manually with:\n{}",
			launcher.remedy_command(port)
		))
	};

	if let Err(err) = launcher.launch(port).await {
		tracing::warn!(target = "scm.session", port, error = %err, "launch failed");
		return Err(failure());
	}

	match connector.connect(&endpoint).await {
		Ok(browser) => {
			tracing::info!(target = "scm.session", %endpoint, "connected to launched browser");
			Ok(browser)
		}
		Err(err) => {
			tracing::warn!(target = "scm.session", %endpoint, error = %err, "connect after launch failed");
			Err(failure())
		}
	}
}

async fn forward_failures(mut from: broadcast::Receiver<TaskFailure>, to: broadcast::Sender<TaskFailure>) {
	loop {
		match from.recv().await {
			Ok(failure) => {
				let _ = to.send(failure);
			}
			Err(broadcast::error::RecvError::Lagged(n)) => {
				tracing::warn!(target = "scm.session", dropped = n, "task failure forwarder lagged");
			}
			Err(broadcast::error::RecvError::Closed) => break,
		}
	}
}

fn shutting_down() -> BridgeError {
	BridgeError::Connection("Session is shutting down".to_string())
}
