//! Process-wide session state: the browser connection, page handles and
//! console buffers, plus their teardown.

mod connection;
mod logs;
mod pages;
mod targets;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use scm::TaskFailure;
use tokio::sync::broadcast;

pub use connection::ConnectionManager;
pub use logs::{LogBuffer, LogEntry, LogFilter, LogReport, LogStore};
pub use pages::PageCache;
pub use targets::{ALLOWED_KINDS, IdentityTier, StableId, TargetView, stable_id};

use crate::browser::{BrowserLike, Connector, PageLike, TargetLike};
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::launcher::Launcher;

/// Shared state injected into every tool call.
pub struct Session {
	config: BridgeConfig,
	connection: ConnectionManager,
	pages: PageCache,
	logs: LogStore,
	cleaned: AtomicBool,
}

impl Session {
	pub fn new(config: BridgeConfig, connector: Arc<dyn Connector>, launcher: Arc<dyn Launcher>) -> Self {
		let logs = LogStore::new(config.max_logs);
		Self {
			config,
			connection: ConnectionManager::new(connector, launcher),
			pages: PageCache::default(),
			logs,
			cleaned: AtomicBool::new(false),
		}
	}

	pub fn config(&self) -> &BridgeConfig {
		&self.config
	}

	/// Live browser connection for `port`, connecting or launching as needed.
	pub async fn ensure_connection(&self, port: u16) -> Result<Arc<dyn BrowserLike>> {
		self.connection.ensure(port).await
	}

	/// Cached page for `id`, attaching and starting console capture on
	/// first use. `None` when the target has no page.
	///
	/// Attachment is serialized per id so concurrent first calls attach
	/// exactly one listener. A cached page whose connection has died is
	/// replaced, and its log buffer carries over to the new page.
	pub async fn acquire_page(&self, target: &dyn TargetLike, id: &StableId) -> Result<Option<Arc<dyn PageLike>>> {
		if let Some(page) = self.live_page(&id.value) {
			return Ok(Some(page));
		}

		let lock = self.pages.creation_lock(&id.value);
		let _guard = lock.lock().await;
		if let Some(page) = self.live_page(&id.value) {
			return Ok(Some(page));
		}

		if self.pages.remove(&id.value).is_some() {
			tracing::warn!(target = "scm.session", id = %id.value, "cached page lost its connection, reattaching");
		}
		let Some(page) = target.page().await? else {
			return Ok(None);
		};
		if self.logs.has_buffer(&id.value) {
			self.logs.reattach(&id.value, page.as_ref());
		} else {
			self.logs.attach(&id.value, page.as_ref());
		}
		self.pages.insert(&id.value, Arc::clone(&page));
		tracing::debug!(target = "scm.session", id = %id.value, tier = %id.tier, "page cached");
		Ok(Some(page))
	}

	fn live_page(&self, id: &str) -> Option<Arc<dyn PageLike>> {
		self.pages.get(id).filter(|page| page.is_live())
	}

	/// Panics of background work on any browser connection this session
	/// has made.
	pub fn task_failures(&self) -> broadcast::Receiver<TaskFailure> {
		self.connection.task_failures()
	}

	pub fn logs(&self) -> &LogStore {
		&self.logs
	}

	pub fn pages(&self) -> &PageCache {
		&self.pages
	}

	/// Releases listeners and caches and disconnects, leaving the browser
	/// running. Only the first call does anything.
	pub fn cleanup(&self) {
		if self.cleaned.swap(true, Ordering::SeqCst) {
			return;
		}
		eprintln!("[simple-console-mcp] Shutting down...");
		tracing::info!(target = "scm.session", pages = self.pages.len(), "cleaning up session");

		self.logs.clear_all();
		self.pages.clear();
		self.connection.close();
	}

	pub fn is_cleaned_up(&self) -> bool {
		self.cleaned.load(Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests;
