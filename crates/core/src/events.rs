//! Lifetime handles for callback-style event consumers.
//!
//! [`Page::on_console`](crate::Page::on_console) spawns a task that feeds a
//! callback; the [`ConsoleSubscription`] it returns is the only way to stop
//! that task. Dropping the handle cancels it.

use tokio::sync::oneshot;

/// RAII handle that cancels a console callback when dropped.
///
/// ```ignore
/// let sub = page.on_console(|msg| println!("{}", msg.text()));
/// // Handler is active while `sub` is held...
/// sub.unsubscribe();
/// ```
pub struct ConsoleSubscription {
	cancel_tx: Option<oneshot::Sender<()>>,
}

impl ConsoleSubscription {
	/// Wraps the cancel side of a callback task.
	pub fn new(cancel_tx: oneshot::Sender<()>) -> Self {
		Self { cancel_tx: Some(cancel_tx) }
	}

	/// Explicitly cancels the subscription, equivalent to dropping it.
	pub fn unsubscribe(mut self) {
		self.cancel();
	}

	/// Whether the callback task may still be running.
	pub fn is_active(&self) -> bool {
		self.cancel_tx.as_ref().is_some_and(|tx| !tx.is_closed())
	}

	fn cancel(&mut self) {
		if let Some(tx) = self.cancel_tx.take() {
			let _ = tx.send(());
		}
	}
}

impl Drop for ConsoleSubscription {
	fn drop(&mut self) {
		self.cancel();
	}
}

impl std::fmt::Debug for ConsoleSubscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ConsoleSubscription").field("active", &self.is_active()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn dropping_subscription_signals_cancel() {
		let (tx, rx) = oneshot::channel();
		let sub = ConsoleSubscription::new(tx);
		assert!(sub.is_active());
		drop(sub);
		assert!(rx.await.is_ok());
	}

	#[tokio::test]
	async fn unsubscribe_signals_cancel() {
		let (tx, rx) = oneshot::channel();
		ConsoleSubscription::new(tx).unsubscribe();
		assert!(rx.await.is_ok());
	}

	#[test]
	fn finished_task_reports_inactive() {
		let (tx, rx) = oneshot::channel::<()>();
		let sub = ConsoleSubscription::new(tx);
		drop(rx);
		assert!(!sub.is_active());
	}
}
