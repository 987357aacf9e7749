//! Console event methods for [`Page`].

use tokio::sync::{broadcast, oneshot};

use super::{ConsoleMessage, Page};
use crate::events::ConsoleSubscription;

impl Page {
	/// Returns a broadcast receiver for console messages.
	pub fn console_messages(&self) -> broadcast::Receiver<ConsoleMessage> {
		self.inner.console_tx.subscribe()
	}

	/// Registers a console message callback via a background task.
	///
	/// Returns a [`ConsoleSubscription`] that cancels the task when dropped.
	/// The task also ends when the page's session goes away. A panicking
	/// handler ends the task and is reported through the page's
	/// [`TaskMonitor`](crate::TaskMonitor).
	pub fn on_console<F>(&self, handler: F) -> ConsoleSubscription
	where
		F: Fn(ConsoleMessage) + Send + Sync + 'static,
	{
		let mut rx = self.console_messages();
		let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

		self.inner.monitor.spawn("console-callback", async move {
			loop {
				tokio::select! {
					result = rx.recv() => {
						match result {
							Ok(msg) => handler(msg),
							Err(broadcast::error::RecvError::Lagged(n)) => {
								tracing::warn!(target = "scm.page", dropped = n, "Console callback lagged");
							}
							Err(broadcast::error::RecvError::Closed) => break,
						}
					}
					_ = &mut cancel_rx => break,
				}
			}
		});

		ConsoleSubscription::new(cancel_tx)
	}
}
