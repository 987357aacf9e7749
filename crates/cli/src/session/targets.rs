//! Index-based target views and stable target identity.

use std::fmt;
use std::sync::Arc;

use scm::TargetKind;

use crate::browser::{BrowserLike, TargetLike};
use crate::error::{BridgeError, Result};

/// Kinds listed by the tools. Everything else is invisible to callers.
pub const ALLOWED_KINDS: [TargetKind; 3] = [TargetKind::Page, TargetKind::ServiceWorker, TargetKind::BackgroundPage];

/// Filtered targets as seen by one call.
///
/// Indices are only meaningful within the call that built the view.
pub struct TargetView {
	targets: Vec<Arc<dyn TargetLike>>,
}

impl TargetView {
	/// Snapshot of the browser's allowed targets in browser order.
	pub fn of(browser: &dyn BrowserLike) -> Self {
		let targets = browser
			.targets()
			.into_iter()
			.filter(|target| ALLOWED_KINDS.contains(&target.kind()))
			.collect();
		Self { targets }
	}

	pub fn len(&self) -> usize {
		self.targets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.targets.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn TargetLike>> {
		self.targets.iter()
	}

	/// Target at `index`, or [`BridgeError::NotFound`].
	pub fn resolve(&self, index: usize) -> Result<&Arc<dyn TargetLike>> {
		self.targets.get(index).ok_or_else(|| {
			BridgeError::NotFound(format!(
				"Target index {index} not found. Use list_targets to see available targets."
			))
		})
	}

	/// One `[index] kind: url` line per target.
	pub fn render(&self) -> String {
		self.targets
			.iter()
			.enumerate()
			.map(|(i, target)| format!("[{i}] {}: {}", target.kind(), target.url()))
			.collect::<Vec<_>>()
			.join("\n")
	}
}

/// Which identity source produced a [`StableId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityTier {
	/// Public identity accessor.
	Accessor,
	/// Client-internal identity.
	Internal,
	/// Current URL. Changes on navigation, so caches keyed by it split.
	Url,
}

impl fmt::Display for IdentityTier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Accessor => "accessor",
			Self::Internal => "internal",
			Self::Url => "url",
		})
	}
}

/// Cache key for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableId {
	pub value: String,
	pub tier: IdentityTier,
}

/// Derives the cache key for `target`: accessor, then internal id, then URL.
pub fn stable_id(target: &dyn TargetLike) -> StableId {
	let id = if let Some(value) = target.id().filter(|v| !v.is_empty()) {
		StableId {
			value,
			tier: IdentityTier::Accessor,
		}
	} else if let Some(value) = target.internal_id().filter(|v| !v.is_empty()) {
		StableId {
			value,
			tier: IdentityTier::Internal,
		}
	} else {
		StableId {
			value: target.url(),
			tier: IdentityTier::Url,
		}
	};
	if id.tier == IdentityTier::Url {
		tracing::debug!(target = "scm.session", url = %id.value, "no stable target id; falling back to URL");
	}
	id
}
