//! Page handles keyed by stable target id.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::browser::PageLike;

/// Cached page handles plus one creation lock per id.
#[derive(Default)]
pub struct PageCache {
	pages: Mutex<HashMap<String, Arc<dyn PageLike>>>,
	creating: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PageCache {
	pub fn get(&self, id: &str) -> Option<Arc<dyn PageLike>> {
		self.pages.lock().get(id).cloned()
	}

	pub fn insert(&self, id: &str, page: Arc<dyn PageLike>) {
		self.pages.lock().insert(id.to_string(), page);
	}

	pub fn remove(&self, id: &str) -> Option<Arc<dyn PageLike>> {
		self.pages.lock().remove(id)
	}

	/// Lock held while a page for `id` is attached.
	pub fn creation_lock(&self, id: &str) -> Arc<tokio::sync::Mutex<()>> {
		Arc::clone(self.creating.lock().entry(id.to_string()).or_default())
	}

	pub fn len(&self) -> usize {
		self.pages.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.pages.lock().is_empty()
	}

	pub fn clear(&self) {
		self.pages.lock().clear();
		self.creating.lock().clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::MockPage;

	#[test]
	fn pages_are_keyed_by_id() {
		let cache = PageCache::default();
		let page = MockPage::new();
		cache.insert("T1", page.clone());

		assert!(cache.get("T1").is_some());
		assert!(cache.get("T2").is_none());
		assert_eq!(cache.len(), 1);
		assert!(cache.remove("T2").is_none());

		cache.clear();
		assert!(cache.is_empty());
	}

	#[test]
	fn creation_lock_is_shared_per_id() {
		let cache = PageCache::default();
		assert!(Arc::ptr_eq(&cache.creation_lock("T1"), &cache.creation_lock("T1")));
		assert!(!Arc::ptr_eq(&cache.creation_lock("T1"), &cache.creation_lock("T2")));
	}
}
