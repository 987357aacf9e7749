//! Request/response correlation for the DevTools protocol.
//!
//! The connection sits on top of a [`TransportParts`] and handles:
//! - Generating unique, increasing command ids
//! - Routing each response to the caller awaiting that id
//! - Broadcasting events (browser level and flattened session level)
//!
//! # Message Flow
//!
//! 1. Caller invokes [`Connection::send`] with a method, params and optional session id
//! 2. The connection registers a oneshot channel under a fresh id
//! 3. The request is queued for the writer task
//! 4. The dispatch loop receives the matching response and completes the oneshot
//! 5. Messages without an id are events and go to every subscriber
//!
//! When the transport ends every pending command fails with
//! [`Error::ChannelClosed`] and subscribers observe a closed channel.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Notify, broadcast, mpsc, oneshot};

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportParts, TransportReceiver};

const EVENT_CAPACITY: usize = 1024;

/// Outgoing command.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
	pub id: u64,
	pub method: String,
	pub params: Value,
	#[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
	pub code: i64,
	pub message: String,
	#[serde(default)]
	pub data: Option<Value>,
}

/// Response to a command, matched to its request by `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
	pub id: u64,
	#[serde(default)]
	pub result: Option<Value>,
	#[serde(default)]
	pub error: Option<ErrorPayload>,
	#[serde(rename = "sessionId", default)]
	pub session_id: Option<String>,
}

/// Unsolicited notification from the browser.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
	pub method: String,
	#[serde(default)]
	pub params: Value,
	/// Set when the event belongs to an attached target session.
	#[serde(rename = "sessionId", default)]
	pub session_id: Option<String>,
}

impl Event {
	/// Decodes the params into a typed payload.
	pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
		Ok(serde_json::from_value(self.params.clone())?)
	}
}

/// Anything the browser can send.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Message {
	Response(Response),
	Event(Event),
	/// Unrecognized shape, ignored for forward compatibility.
	Unknown(Value),
}

enum Outbound {
	Message(Value),
	Close,
}

type CallbackMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;

/// Removes the pending callback when a request future is dropped early.
struct CancelGuard {
	id: u64,
	callbacks: CallbackMap,
	completed: bool,
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if !self.completed && self.callbacks.lock().remove(&self.id).is_some() {
			tracing::debug!(target = "scm.connection", id = self.id, "removed orphaned callback");
		}
	}
}

struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.completed = true;
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Connection to a browser's DevTools endpoint.
pub struct Connection {
	last_id: AtomicU64,
	callbacks: CallbackMap,
	outbound_tx: mpsc::UnboundedSender<Outbound>,
	outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Outbound>>>,
	/// Dropped when the dispatch loop ends so subscribers see `Closed`.
	events_tx: Mutex<Option<broadcast::Sender<Event>>>,
	connected: AtomicBool,
	shutdown: Notify,
	transport_sender: Mutex<Option<Box<dyn Transport>>>,
	transport_receiver: Mutex<Option<Box<dyn TransportReceiver>>>,
	message_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
}

impl Connection {
	pub fn new(parts: TransportParts) -> Self {
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
		Self {
			last_id: AtomicU64::new(1),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx,
			outbound_rx: Mutex::new(Some(outbound_rx)),
			events_tx: Mutex::new(Some(events_tx)),
			connected: AtomicBool::new(true),
			shutdown: Notify::new(),
			transport_sender: Mutex::new(Some(parts.sender)),
			transport_receiver: Mutex::new(Some(parts.receiver)),
			message_rx: Mutex::new(Some(parts.message_rx)),
		}
	}

	/// Whether the transport is still up and [`close`](Self::close) was not called.
	pub fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	/// Sends a command and waits for its result.
	///
	/// `session_id` routes the command to an attached target. Dropping the
	/// returned future before completion forgets the request.
	pub async fn send(&self, method: &str, params: Value, session_id: Option<&str>) -> Result<Value> {
		if !self.is_connected() {
			return Err(Error::ChannelClosed);
		}

		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, tx);
		let guard = CancelGuard {
			id,
			callbacks: Arc::clone(&self.callbacks),
			completed: false,
		};

		let request = Request {
			id,
			method: method.to_string(),
			params,
			session_id: session_id.map(str::to_string),
		};
		tracing::trace!(target = "scm.connection", id, method, session = ?request.session_id, "send");

		let value = serde_json::to_value(&request)?;
		if self.outbound_tx.send(Outbound::Message(value)).is_err() {
			return Err(Error::ChannelClosed);
		}

		ResponseFuture { rx, guard }.await
	}

	/// New receiver for every event received from now on.
	///
	/// After the connection ended the receiver is already closed.
	pub fn subscribe(&self) -> broadcast::Receiver<Event> {
		match self.events_tx.lock().as_ref() {
			Some(tx) => tx.subscribe(),
			None => broadcast::channel(1).1,
		}
	}

	/// Closes the transport. Pending and future commands fail.
	pub fn close(&self) {
		if self.connected.swap(false, Ordering::SeqCst) {
			tracing::debug!(target = "scm.connection", "closing connection");
		}
		let _ = self.outbound_tx.send(Outbound::Close);
		self.shutdown.notify_one();
	}

	/// Runs the reader, writer and dispatch loop until the transport ends
	/// or [`close`](Self::close) is called. Only the first call does anything.
	pub async fn run(self: &Arc<Self>) {
		let taken = (
			self.transport_receiver.lock().take(),
			self.transport_sender.lock().take(),
			self.outbound_rx.lock().take(),
			self.message_rx.lock().take(),
		);
		let (Some(receiver), Some(mut sender), Some(mut outbound_rx), Some(mut message_rx)) = taken else {
			tracing::warn!(target = "scm.connection", "run() called more than once");
			return;
		};

		let reader = tokio::spawn(async move {
			if let Err(e) = receiver.run().await {
				tracing::warn!(target = "scm.connection", error = %e, "transport read error");
			}
		});

		let writer = tokio::spawn(async move {
			while let Some(outbound) = outbound_rx.recv().await {
				match outbound {
					Outbound::Message(message) => {
						if let Err(e) = sender.send(message).await {
							tracing::warn!(target = "scm.connection", error = %e, "transport write error");
							break;
						}
					}
					Outbound::Close => {
						let _ = sender.close().await;
						break;
					}
				}
			}
		});

		loop {
			tokio::select! {
				message = message_rx.recv() => match message {
					Some(value) => match serde_json::from_value::<Message>(value) {
						Ok(message) => self.dispatch(message),
						Err(e) => tracing::warn!(target = "scm.connection", error = %e, "unparseable message"),
					},
					None => break,
				},
				_ = self.shutdown.notified() => break,
			}
		}

		self.connected.store(false, Ordering::SeqCst);
		let _ = self.outbound_tx.send(Outbound::Close);
		let _ = writer.await;
		reader.abort();

		let pending: Vec<_> = self.callbacks.lock().drain().collect();
		for (_, callback) in pending {
			let _ = callback.send(Err(Error::ChannelClosed));
		}
		self.events_tx.lock().take();
		tracing::debug!(target = "scm.connection", "connection ended");
	}

	pub(crate) fn dispatch(&self, message: Message) {
		match message {
			Message::Response(response) => {
				let Some(callback) = self.callbacks.lock().remove(&response.id) else {
					tracing::debug!(target = "scm.connection", id = response.id, "response for unknown request");
					return;
				};
				let result = match response.error {
					Some(error) => Err(Error::Remote {
						code: error.code,
						message: error.message,
					}),
					None => Ok(response.result.unwrap_or(Value::Null)),
				};
				let _ = callback.send(result);
			}
			Message::Event(event) => {
				tracing::trace!(target = "scm.connection", method = %event.method, "event");
				if let Some(tx) = self.events_tx.lock().as_ref() {
					let _ = tx.send(event);
				}
			}
			Message::Unknown(value) => {
				tracing::debug!(target = "scm.connection", %value, "unknown message (ignored)");
			}
		}
	}
}
