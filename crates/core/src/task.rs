//! Supervised background tasks.
//!
//! Every task the client spawns (connection loop, target tracker, console
//! forwarder, console callbacks) runs through a [`TaskMonitor`]. A panic
//! ends only that task; the monitor logs it and broadcasts a
//! [`TaskFailure`] so the embedding program can react.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const FAILURE_CAPACITY: usize = 16;

/// A background task that ended by panicking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
	/// Name the task was spawned under, e.g. `console-callback`.
	pub task: &'static str,
	pub message: String,
}

/// Spawns named tasks and reports their panics to subscribers.
///
/// Clones share one failure channel.
#[derive(Clone)]
pub struct TaskMonitor {
	failures: broadcast::Sender<TaskFailure>,
}

impl Default for TaskMonitor {
	fn default() -> Self {
		Self::new()
	}
}

impl TaskMonitor {
	pub fn new() -> Self {
		let (failures, _) = broadcast::channel(FAILURE_CAPACITY);
		Self { failures }
	}

	/// Receives every failure reported after this call.
	pub fn subscribe(&self) -> broadcast::Receiver<TaskFailure> {
		self.failures.subscribe()
	}

	/// Spawns `future` under `task`. Aborting the returned handle cancels it.
	pub fn spawn<F>(&self, task: &'static str, future: F) -> JoinHandle<()>
	where
		F: Future<Output = ()> + Send + 'static,
	{
		let failures = self.failures.clone();
		tokio::spawn(async move {
			if let Err(panic) = AssertUnwindSafe(future).catch_unwind().await {
				let message = panic_message(panic.as_ref());
				tracing::error!(target = "scm.task", task, %message, "background task panicked");
				let _ = failures.send(TaskFailure { task, message });
			}
		})
	}
}

impl std::fmt::Debug for TaskMonitor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TaskMonitor")
			.field("subscribers", &self.failures.receiver_count())
			.finish()
	}
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
	if let Some(text) = panic.downcast_ref::<&str>() {
		(*text).to_string()
	} else if let Some(text) = panic.downcast_ref::<String>() {
		text.clone()
	} else {
		"non-string panic payload".to_string()
	}
}
