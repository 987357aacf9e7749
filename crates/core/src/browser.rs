//! Browser-level connection and target registry.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use scm_protocol::cdp::{GetTargetsResult, TargetCreated, TargetDestroyed, TargetInfo, TargetInfoChanged, VersionInfo};
use scm_runtime::{Connection, Error, Event, Result, TransportParts, WebSocketTransport};
use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::target::Target;
use crate::task::{TaskFailure, TaskMonitor};

/// Live targets keyed by `targetId`, in the order the browser reported them.
pub(crate) type Registry = Arc<Mutex<IndexMap<String, TargetInfo>>>;

/// A connected browser.
///
/// Cloning is cheap and shares the connection. Dropping the last clone
/// closes the WebSocket; the browser process itself is never closed.
#[derive(Clone)]
pub struct Browser {
	inner: Arc<BrowserInner>,
}

struct BrowserInner {
	connection: Arc<Connection>,
	registry: Registry,
	monitor: TaskMonitor,
	tracker: JoinHandle<()>,
}

impl Drop for BrowserInner {
	fn drop(&mut self) {
		self.connection.close();
		self.tracker.abort();
	}
}

impl Browser {
	/// Connects to a browser's debugging endpoint.
	///
	/// `ws://` and `wss://` endpoints are used as-is. Anything else is
	/// treated as the HTTP base of the DevTools server and resolved through
	/// `/json/version`.
	pub async fn connect(endpoint: &str) -> Result<Self> {
		let ws_url = if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
			endpoint.to_string()
		} else {
			discover_websocket_url(endpoint).await?
		};
		tracing::debug!(target = "scm.browser", %ws_url, "connecting");
		let parts = WebSocketTransport::connect(&ws_url).await?;
		Self::from_transport(parts).await
	}

	/// Builds a browser over an already open transport.
	pub async fn from_transport(parts: TransportParts) -> Result<Self> {
		let monitor = TaskMonitor::new();
		let connection = Arc::new(Connection::new(parts));
		let runner = {
			let connection = Arc::clone(&connection);
			monitor.spawn("connection", async move { connection.run().await })
		};

		let registry: Registry = Arc::new(Mutex::new(IndexMap::new()));
		let seed = match fetch_targets(&connection).await {
			Ok(seed) => seed,
			Err(e) => {
				connection.close();
				runner.abort();
				return Err(e);
			}
		};
		registry
			.lock()
			.extend(seed.target_infos.into_iter().map(|info| (info.target_id.clone(), info)));

		// Subscribe before discovery starts so no target event is missed.
		let events = connection.subscribe();
		let tracker = monitor.spawn("target-tracker", track_targets(events, Arc::clone(&registry)));
		let inner = Arc::new(BrowserInner {
			connection,
			registry,
			monitor,
			tracker,
		});
		inner
			.connection
			.send("Target.setDiscoverTargets", json!({"discover": true}), None)
			.await?;

		tracing::debug!(target = "scm.browser", targets = inner.registry.lock().len(), "connected");
		Ok(Self { inner })
	}

	/// Snapshot of the current targets in browser order.
	pub fn targets(&self) -> Vec<Target> {
		self.inner
			.registry
			.lock()
			.values()
			.map(|info| {
				Target::new(
					info.clone(),
					Arc::clone(&self.inner.connection),
					Arc::clone(&self.inner.registry),
					self.inner.monitor.clone(),
				)
			})
			.collect()
	}

	pub fn is_connected(&self) -> bool {
		self.inner.connection.is_connected()
	}

	/// Panics of this browser's background tasks, including console
	/// callbacks registered on its pages.
	pub fn task_failures(&self) -> broadcast::Receiver<TaskFailure> {
		self.inner.monitor.subscribe()
	}

	/// Closes the WebSocket without closing the browser.
	pub fn disconnect(&self) {
		self.inner.connection.close();
	}
}

async fn fetch_targets(connection: &Connection) -> Result<GetTargetsResult> {
	let value = connection.send("Target.getTargets", json!({}), None).await?;
	Ok(serde_json::from_value(value)?)
}

async fn discover_websocket_url(endpoint: &str) -> Result<String> {
	let url = format!("{}/json/version", endpoint.trim_end_matches('/'));
	let response = reqwest::get(&url)
		.await
		.map_err(|e| Error::ConnectionFailed(format!("{url}: {e}")))?;
	if !response.status().is_success() {
		return Err(Error::Http(format!("{url}: unexpected status {}", response.status())));
	}
	let info: VersionInfo = response
		.json()
		.await
		.map_err(|e| Error::Http(format!("Failed to parse {url}: {e}")))?;
	tracing::debug!(target = "scm.browser", browser = ?info.browser, "discovered endpoint");
	Ok(info.web_socket_debugger_url)
}

async fn track_targets(mut events: broadcast::Receiver<Event>, registry: Registry) {
	loop {
		match events.recv().await {
			Ok(event) if event.session_id.is_none() => apply_target_event(&registry, &event),
			Ok(_) => {}
			Err(broadcast::error::RecvError::Lagged(n)) => {
				tracing::warn!(target = "scm.browser", dropped = n, "target tracker lagged");
			}
			Err(broadcast::error::RecvError::Closed) => break,
		}
	}
}

fn apply_target_event(registry: &Registry, event: &Event) {
	match event.method.as_str() {
		"Target.targetCreated" => {
			if let Ok(TargetCreated { target_info }) = event.parse::<TargetCreated>() {
				registry.lock().insert(target_info.target_id.clone(), target_info);
			}
		}
		"Target.targetInfoChanged" => {
			if let Ok(TargetInfoChanged { target_info }) = event.parse::<TargetInfoChanged>() {
				registry.lock().insert(target_info.target_id.clone(), target_info);
			}
		}
		"Target.targetDestroyed" => {
			if let Ok(TargetDestroyed { target_id }) = event.parse::<TargetDestroyed>() {
				registry.lock().shift_remove(&target_id);
			}
		}
		_ => {}
	}
}
