//! Seams between the session core and the CDP client.
//!
//! The session only talks to these traits, so tests can drive it with
//! in-crate fakes while the binary uses the [`cdp`] adapters
//! over [`scm`].

pub mod cdp;

use std::sync::Arc;

use async_trait::async_trait;
use scm::{ConsoleMessage, ConsoleSubscription, TargetKind, TaskFailure};
use tokio::sync::broadcast;

use crate::error::Result;

/// Callback fed with every console message of a page.
pub type ConsoleHandler = Box<dyn Fn(ConsoleMessage) + Send + Sync>;

/// Opens browser connections.
#[async_trait]
pub trait Connector: Send + Sync {
	/// Connects to the DevTools server at `endpoint` (for example `http://localhost:9222`).
	async fn connect(&self, endpoint: &str) -> Result<Arc<dyn BrowserLike>>;
}

/// A live browser connection.
pub trait BrowserLike: Send + Sync {
	fn is_connected(&self) -> bool;

	/// Every target the browser currently reports, in browser order.
	fn targets(&self) -> Vec<Arc<dyn TargetLike>>;

	/// Drops the connection. The browser keeps running.
	fn disconnect(&self);

	/// Panics of the connection's background tasks and console callbacks.
	fn task_failures(&self) -> broadcast::Receiver<TaskFailure>;
}

/// One debuggable target.
#[async_trait]
pub trait TargetLike: Send + Sync {
	fn kind(&self) -> TargetKind;

	/// Current URL; changes on navigation.
	fn url(&self) -> String;

	/// Identity exposed by the client, stable across navigation.
	fn id(&self) -> Option<String>;

	/// Client-internal identity, for clients without a public accessor.
	fn internal_id(&self) -> Option<String> {
		None
	}

	/// Page handle, or `None` for targets without one.
	async fn page(&self) -> Result<Option<Arc<dyn PageLike>>>;
}

/// Page operations the tools need.
#[async_trait]
pub trait PageLike: Send + Sync {
	/// Whether the page can still reach the browser. A dead page never
	/// recovers and has to be attached again.
	fn is_live(&self) -> bool {
		true
	}

	/// Registers a console callback; dropping the subscription removes it.
	fn on_console(&self, handler: ConsoleHandler) -> ConsoleSubscription;

	/// Navigates and waits for DOM content loaded.
	async fn goto(&self, url: &str) -> Result<()>;

	/// Reloads and waits for DOM content loaded.
	async fn reload(&self) -> Result<()>;

	async fn title(&self) -> Result<String>;

	async fn current_url(&self) -> Result<String>;
}
