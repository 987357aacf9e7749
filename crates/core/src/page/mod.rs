//! [`Page`]: an attached session on a page-like target.

mod eval;
mod page_events;

use std::fmt;
use std::sync::Arc;

use scm_protocol::cdp::{AttachToTargetResult, ConsoleApiCalled, NavigateResult};
use scm_runtime::{Connection, Error, Event, Result};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::task::TaskMonitor;

const CONSOLE_CAPACITY: usize = 256;

/// A browser tab (or extension background page) attached over a flattened
/// CDP session.
///
/// Cloning shares the session. Dropping the last clone stops console
/// forwarding but leaves the tab open.
#[derive(Clone)]
pub struct Page {
	inner: Arc<PageInner>,
}

struct PageInner {
	target_id: String,
	session_id: String,
	connection: Arc<Connection>,
	/// Console message broadcast channel.
	console_tx: broadcast::Sender<ConsoleMessage>,
	monitor: TaskMonitor,
	pump: JoinHandle<()>,
}

impl Drop for PageInner {
	fn drop(&mut self) {
		self.pump.abort();
	}
}

/// Console message from JavaScript `console.*` calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleMessage {
	kind: ConsoleMessageKind,
	type_name: String,
	text: String,
}

impl ConsoleMessage {
	pub fn new(kind: ConsoleMessageKind, text: impl Into<String>) -> Self {
		Self {
			kind,
			type_name: kind.as_str().to_string(),
			text: text.into(),
		}
	}

	/// Builds a message from the raw CDP `type`, keeping names the
	/// [`ConsoleMessageKind`] enum does not know.
	pub fn from_cdp(kind: &str, text: impl Into<String>) -> Self {
		let parsed = ConsoleMessageKind::from_cdp(kind);
		let type_name = match parsed {
			ConsoleMessageKind::Other => kind.to_string(),
			known => known.as_str().to_string(),
		};
		Self {
			kind: parsed,
			type_name,
			text: text.into(),
		}
	}

	/// Returns the type of console message.
	pub fn kind(&self) -> ConsoleMessageKind {
		self.kind
	}

	/// Console type name: [`ConsoleMessageKind::as_str`] for known kinds,
	/// the browser's own spelling (`startGroup`, `countReset`) otherwise.
	pub fn type_name(&self) -> &str {
		&self.type_name
	}

	/// Returns the text content of the message.
	pub fn text(&self) -> &str {
		&self.text
	}
}

impl From<&ConsoleApiCalled> for ConsoleMessage {
	fn from(event: &ConsoleApiCalled) -> Self {
		Self::from_cdp(&event.kind, event.text())
	}
}

/// The type of console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleMessageKind {
	/// `console.log()`
	Log,
	/// `console.debug()`
	Debug,
	/// `console.info()`
	Info,
	/// `console.warn()`
	Warning,
	/// `console.error()`
	Error,
	/// `console.dir()`
	Dir,
	/// `console.dirxml()`
	DirXml,
	/// `console.table()`
	Table,
	/// `console.trace()`
	Trace,
	/// `console.clear()`
	Clear,
	/// `console.count()`
	Count,
	/// `console.assert()`
	Assert,
	/// `console.profile()`
	Profile,
	/// `console.profileEnd()`
	ProfileEnd,
	/// `console.timeEnd()`
	TimeEnd,
	/// Unknown console type
	Other,
}

impl ConsoleMessageKind {
	/// Maps the `type` of a `Runtime.consoleAPICalled` event.
	pub fn from_cdp(s: &str) -> Self {
		match s {
			"log" => Self::Log,
			"debug" => Self::Debug,
			"info" => Self::Info,
			"warning" => Self::Warning,
			"error" => Self::Error,
			"dir" => Self::Dir,
			"dirxml" => Self::DirXml,
			"table" => Self::Table,
			"trace" => Self::Trace,
			"clear" => Self::Clear,
			"count" => Self::Count,
			"assert" => Self::Assert,
			"profile" => Self::Profile,
			"profileEnd" => Self::ProfileEnd,
			"timeEnd" => Self::TimeEnd,
			_ => Self::Other,
		}
	}

	/// Name as `console.*` spells it; warnings are `warn`.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Log => "log",
			Self::Debug => "debug",
			Self::Info => "info",
			Self::Warning => "warn",
			Self::Error => "error",
			Self::Dir => "dir",
			Self::DirXml => "dirxml",
			Self::Table => "table",
			Self::Trace => "trace",
			Self::Clear => "clear",
			Self::Count => "count",
			Self::Assert => "assert",
			Self::Profile => "profile",
			Self::ProfileEnd => "profileEnd",
			Self::TimeEnd => "timeEnd",
			Self::Other => "other",
		}
	}
}

impl fmt::Display for ConsoleMessageKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Page {
	/// Attaches to `target_id` and enables the `Page` and `Runtime` domains.
	pub(crate) async fn attach(connection: Arc<Connection>, target_id: &str, monitor: TaskMonitor) -> Result<Self> {
		let attached: AttachToTargetResult = serde_json::from_value(
			connection
				.send("Target.attachToTarget", json!({"targetId": target_id, "flatten": true}), None)
				.await?,
		)?;
		let session_id = attached.session_id;
		tracing::debug!(target = "scm.page", target_id, session = %session_id, "attached");

		let (console_tx, _) = broadcast::channel(CONSOLE_CAPACITY);
		let pump = monitor.spawn(
			"console-forwarder",
			forward_console(connection.subscribe(), session_id.clone(), console_tx.clone()),
		);

		let page = Self {
			inner: Arc::new(PageInner {
				target_id: target_id.to_string(),
				session_id,
				connection,
				console_tx,
				monitor,
				pump,
			}),
		};
		page.send("Page.enable", json!({})).await?;
		page.send("Runtime.enable", json!({})).await?;
		Ok(page)
	}

	/// CDP `targetId` of the underlying target.
	pub fn target_id(&self) -> &str {
		&self.inner.target_id
	}

	/// Session id assigned by `Target.attachToTarget`.
	pub fn session_id(&self) -> &str {
		&self.inner.session_id
	}

	/// Whether the browser connection this page was attached over is still up.
	/// A page never reattaches; once this is `false` it stays `false`.
	pub fn is_connected(&self) -> bool {
		self.inner.connection.is_connected()
	}

	async fn send(&self, method: &str, params: Value) -> Result<Value> {
		self.inner.connection.send(method, params, Some(&self.inner.session_id)).await
	}

	/// Navigates the main frame and waits for `DOMContentLoaded`.
	///
	/// Same-document navigations (fragment changes) return as soon as the
	/// browser acknowledges them.
	pub async fn goto(&self, url: &str) -> Result<()> {
		let mut events = self.inner.connection.subscribe();
		let result: NavigateResult = serde_json::from_value(self.send("Page.navigate", json!({"url": url})).await?)?;

		if let Some(reason) = result.error_text.filter(|text| !text.is_empty()) {
			return Err(Error::Navigation {
				url: url.to_string(),
				reason,
			});
		}
		if result.loader_id.is_some() {
			self.wait_for_event(&mut events, "Page.domContentEventFired").await?;
		}
		Ok(())
	}

	/// Reloads the page and waits for `DOMContentLoaded`.
	pub async fn reload(&self) -> Result<()> {
		let mut events = self.inner.connection.subscribe();
		self.send("Page.reload", json!({})).await?;
		self.wait_for_event(&mut events, "Page.domContentEventFired").await?;
		Ok(())
	}

	/// Waits for the next event of this session named `method`.
	async fn wait_for_event(&self, events: &mut broadcast::Receiver<Event>, method: &str) -> Result<Event> {
		loop {
			match events.recv().await {
				Ok(event) if event.method == method && event.session_id.as_deref() == Some(self.session_id()) => {
					return Ok(event);
				}
				Ok(_) => {}
				Err(broadcast::error::RecvError::Lagged(n)) => {
					tracing::warn!(target = "scm.page", dropped = n, method, "event receiver lagged");
				}
				Err(broadcast::error::RecvError::Closed) => return Err(Error::ChannelClosed),
			}
		}
	}
}

impl fmt::Debug for Page {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Page")
			.field("target_id", &self.inner.target_id)
			.field("session_id", &self.inner.session_id)
			.finish()
	}
}

/// Forwards this session's `Runtime.consoleAPICalled` events as [`ConsoleMessage`]s.
async fn forward_console(
	mut events: broadcast::Receiver<Event>,
	session_id: String,
	console_tx: broadcast::Sender<ConsoleMessage>,
) {
	loop {
		match events.recv().await {
			Ok(event) if event.method == "Runtime.consoleAPICalled" && event.session_id.as_deref() == Some(session_id.as_str()) => {
				match event.parse::<ConsoleApiCalled>() {
					Ok(call) => {
						let _ = console_tx.send(ConsoleMessage::from(&call));
					}
					Err(e) => tracing::debug!(target = "scm.page", error = %e, "malformed console event"),
				}
			}
			Ok(_) => {}
			Err(broadcast::error::RecvError::Lagged(n)) => {
				tracing::warn!(target = "scm.page", dropped = n, "console forwarder lagged");
			}
			Err(broadcast::error::RecvError::Closed) => break,
		}
	}
}
