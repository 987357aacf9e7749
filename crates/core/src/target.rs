//! Debuggable targets reported by the browser.

use std::fmt;
use std::sync::Arc;

use scm_protocol::cdp::TargetInfo;
use scm_runtime::{Connection, Result};

use crate::browser::Registry;
use crate::page::Page;
use crate::task::TaskMonitor;

/// Coarse classification of a target's CDP `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
	Page,
	ServiceWorker,
	BackgroundPage,
	/// Iframes, shared workers, the browser itself and anything newer.
	Other,
}

impl TargetKind {
	pub fn from_cdp(kind: &str) -> Self {
		match kind {
			"page" => Self::Page,
			"service_worker" => Self::ServiceWorker,
			"background_page" => Self::BackgroundPage,
			_ => Self::Other,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Page => "page",
			Self::ServiceWorker => "service_worker",
			Self::BackgroundPage => "background_page",
			Self::Other => "other",
		}
	}

	/// Kinds that own a document and can be attached as a [`Page`].
	pub fn has_page(self) -> bool {
		matches!(self, Self::Page | Self::BackgroundPage)
	}
}

impl fmt::Display for TargetKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Handle to one target.
///
/// The handle is a snapshot taken from the browser's registry, but
/// [`url`](Self::url) and [`title`](Self::title) read the registry again so
/// they follow navigations. [`id`](Self::id) never changes.
#[derive(Clone)]
pub struct Target {
	info: TargetInfo,
	connection: Arc<Connection>,
	registry: Registry,
	monitor: TaskMonitor,
}

impl Target {
	pub(crate) fn new(info: TargetInfo, connection: Arc<Connection>, registry: Registry, monitor: TaskMonitor) -> Self {
		Self {
			info,
			connection,
			registry,
			monitor,
		}
	}

	/// CDP `targetId`, stable for the lifetime of the target.
	pub fn id(&self) -> &str {
		&self.info.target_id
	}

	pub fn kind(&self) -> TargetKind {
		TargetKind::from_cdp(&self.info.kind)
	}

	/// Current URL, or the last one seen if the target is gone.
	pub fn url(&self) -> String {
		self.registry
			.lock()
			.get(self.id())
			.map(|info| info.url.clone())
			.unwrap_or_else(|| self.info.url.clone())
	}

	pub fn title(&self) -> String {
		self.registry
			.lock()
			.get(self.id())
			.map(|info| info.title.clone())
			.unwrap_or_else(|| self.info.title.clone())
	}

	/// Raw info as captured when this handle was created.
	pub fn info(&self) -> &TargetInfo {
		&self.info
	}

	/// Attaches to the target and returns its page.
	///
	/// Targets that are not page-like yield `None`. Every call creates a new
	/// session; callers that want one page per target should cache it.
	pub async fn page(&self) -> Result<Option<Page>> {
		if !self.kind().has_page() {
			return Ok(None);
		}
		Page::attach(Arc::clone(&self.connection), self.id(), self.monitor.clone())
			.await
			.map(Some)
	}
}

impl fmt::Debug for Target {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Target")
			.field("id", &self.info.target_id)
			.field("kind", &self.kind())
			.field("url", &self.url())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn kind_round_trips_known_types() {
		for kind in ["page", "service_worker", "background_page"] {
			assert_eq!(TargetKind::from_cdp(kind).as_str(), kind);
		}
		assert_eq!(TargetKind::from_cdp("iframe"), TargetKind::Other);
		assert_eq!(TargetKind::from_cdp("shared_worker").to_string(), "other");
	}

	#[test]
	fn only_document_targets_have_pages() {
		assert!(TargetKind::Page.has_page());
		assert!(TargetKind::BackgroundPage.has_page());
		assert!(!TargetKind::ServiceWorker.has_page());
		assert!(!TargetKind::Other.has_page());
	}
}
