//! Per-target console capture.
//!
//! Each stable target id owns one bounded [`LogBuffer`], created when the
//! page's console listener is attached and cleared (never removed) on
//! navigation. A page reattached after a reconnect keeps feeding the same
//! buffer.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use scm::{ConsoleMessage, ConsoleSubscription};
use serde::{Deserialize, Serialize};

use crate::browser::PageLike;

/// One captured console call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
	/// ISO-8601 UTC, millisecond precision.
	pub timestamp: String,
	/// Upper-case console type (`LOG`, `WARN`, `STARTGROUP`, ...).
	pub severity: String,
	pub text: String,
}

impl LogEntry {
	/// Stamps `message` with the current time.
	pub fn capture(message: &ConsoleMessage) -> Self {
		Self {
			timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
			severity: message.type_name().to_uppercase(),
			text: message.text().to_string(),
		}
	}

	pub fn render(&self) -> String {
		format!("[{}] {}: {}", self.timestamp, self.severity, self.text)
	}
}

/// FIFO ring of [`LogEntry`] with a fixed capacity.
#[derive(Debug)]
pub struct LogBuffer {
	capacity: usize,
	entries: Mutex<VecDeque<LogEntry>>,
}

impl LogBuffer {
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity: capacity.max(1),
			entries: Mutex::new(VecDeque::new()),
		}
	}

	/// Appends, evicting the oldest entry past capacity.
	pub fn push(&self, entry: LogEntry) {
		let mut entries = self.entries.lock();
		entries.push_back(entry);
		while entries.len() > self.capacity {
			entries.pop_front();
		}
	}

	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	pub fn snapshot(&self) -> Vec<LogEntry> {
		self.entries.lock().iter().cloned().collect()
	}
}

/// Severity filter accepted by `get_console_logs`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFilter {
	#[default]
	All,
	Error,
	Warn,
	Log,
	Info,
	Debug,
}

impl LogFilter {
	pub const NAMES: [&'static str; 6] = ["all", "error", "warn", "log", "info", "debug"];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::All => "all",
			Self::Error => "error",
			Self::Warn => "warn",
			Self::Log => "log",
			Self::Info => "info",
			Self::Debug => "debug",
		}
	}

	pub fn matches(self, entry: &LogEntry) -> bool {
		self == Self::All || entry.severity.eq_ignore_ascii_case(self.as_str())
	}
}

impl fmt::Display for LogFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Result of [`LogStore::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogReport {
	/// Rendered lines, newline-joined. Empty when nothing matched.
	pub text: String,
	pub shown: usize,
	pub matched: usize,
	pub total: usize,
}

/// All log buffers and their console subscriptions, keyed by stable id.
pub struct LogStore {
	capacity: usize,
	buffers: Mutex<HashMap<String, Arc<LogBuffer>>>,
	subscriptions: Mutex<HashMap<String, ConsoleSubscription>>,
}

impl LogStore {
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity,
			buffers: Mutex::new(HashMap::new()),
			subscriptions: Mutex::new(HashMap::new()),
		}
	}

	/// Starts capturing `page`'s console into a fresh buffer for `id`.
	///
	/// Returns `false` without subscribing when `id` already has a buffer.
	pub fn attach(&self, id: &str, page: &dyn PageLike) -> bool {
		let buffer = {
			let mut buffers = self.buffers.lock();
			if buffers.contains_key(id) {
				return false;
			}
			let buffer = Arc::new(LogBuffer::new(self.capacity));
			buffers.insert(id.to_string(), Arc::clone(&buffer));
			buffer
		};

		self.subscribe(id, buffer, page);
		tracing::debug!(target = "scm.session", id, "console capture attached");
		true
	}

	/// Moves capture for `id` onto `page`, keeping the buffer and its
	/// entries. The previous page's subscription is cancelled.
	pub fn reattach(&self, id: &str, page: &dyn PageLike) {
		let buffer = Arc::clone(
			self.buffers
				.lock()
				.entry(id.to_string())
				.or_insert_with(|| Arc::new(LogBuffer::new(self.capacity))),
		);
		self.subscribe(id, buffer, page);
		tracing::debug!(target = "scm.session", id, "console capture moved to new page");
	}

	fn subscribe(&self, id: &str, buffer: Arc<LogBuffer>, page: &dyn PageLike) {
		let subscription = page.on_console(Box::new(move |message| buffer.push(LogEntry::capture(&message))));
		if let Some(previous) = self.subscriptions.lock().insert(id.to_string(), subscription) {
			previous.unsubscribe();
		}
	}

	pub fn has_buffer(&self, id: &str) -> bool {
		self.buffers.lock().contains_key(id)
	}

	/// Last `max_lines` entries matching `filter`, plus the three counts.
	pub fn read(&self, id: &str, max_lines: usize, filter: LogFilter) -> LogReport {
		let entries = self.buffers.lock().get(id).map(|b| b.snapshot()).unwrap_or_default();
		let total = entries.len();
		let matched: Vec<&LogEntry> = entries.iter().filter(|entry| filter.matches(entry)).collect();
		let start = matched.len().saturating_sub(max_lines);
		let shown = &matched[start..];

		LogReport {
			text: shown.iter().map(|entry| entry.render()).collect::<Vec<_>>().join("\n"),
			shown: shown.len(),
			matched: matched.len(),
			total,
		}
	}

	/// Empties the buffer for `id`, if any.
	pub fn clear(&self, id: &str) {
		if let Some(buffer) = self.buffers.lock().get(id) {
			buffer.clear();
		}
	}

	/// Cancels every console subscription and forgets all buffers.
	pub fn clear_all(&self) {
		let subscriptions: Vec<_> = self.subscriptions.lock().drain().collect();
		for (_, subscription) in subscriptions {
			subscription.unsubscribe();
		}
		self.buffers.lock().clear();
	}
}
