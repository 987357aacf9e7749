//! Transport layer for the DevTools protocol.
//!
//! A transport moves whole JSON messages in both directions. The
//! [`Connection`](crate::Connection) never sees frames or sockets; it holds a
//! boxed [`Transport`] for writing and drains decoded messages from an
//! unbounded channel fed by a [`TransportReceiver`].
//!
//! Two implementations exist:
//! - [`WebSocketTransport`]: the browser's debugger WebSocket
//! - [`memory`]: an in-process channel pair whose far end is a [`MemoryPeer`]

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::error::{Error, Result};

/// Boxed future returned by transport operations.
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Write half of a transport.
pub trait Transport: Send {
	/// Sends one JSON message.
	fn send(&mut self, message: Value) -> TransportFuture<'_>;

	/// Closes the write half. Further sends fail.
	fn close(&mut self) -> TransportFuture<'_>;
}

/// Read half of a transport. Runs until the peer goes away.
pub trait TransportReceiver: Send {
	fn run(self: Box<Self>) -> TransportFuture<'static>;
}

/// Everything a [`Connection`](crate::Connection) needs from a transport.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	/// Decoded inbound messages, fed by `receiver`.
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// Outcome of decoding one WebSocket frame.
#[derive(Debug, PartialEq)]
pub(crate) enum Frame {
	Json(Value),
	Skip,
	Close,
}

pub(crate) fn decode(message: WsMessage) -> Result<Frame> {
	match message {
		WsMessage::Text(text) => Ok(Frame::Json(serde_json::from_str(&text)?)),
		WsMessage::Binary(bytes) => Ok(Frame::Json(serde_json::from_slice(&bytes)?)),
		WsMessage::Close(_) => Ok(Frame::Close),
		_ => Ok(Frame::Skip),
	}
}

/// WebSocket transport to a browser's `webSocketDebuggerUrl`.
pub struct WebSocketTransport;

impl WebSocketTransport {
	/// Opens the WebSocket and splits it into transport parts.
	pub async fn connect(url: &str) -> Result<TransportParts> {
		tracing::debug!(target = "scm.transport", %url, "opening websocket");
		let (stream, _) = tokio_tungstenite::connect_async(url)
			.await
			.map_err(|e| Error::ConnectionFailed(format!("{url}: {e}")))?;
		Ok(Self::from_stream(stream))
	}

	/// Wraps an already established WebSocket stream.
	pub fn from_stream<S>(stream: WebSocketStream<S>) -> TransportParts
	where
		S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
	{
		let (sink, stream) = stream.split();
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		TransportParts {
			sender: Box::new(WebSocketSender { sink }),
			receiver: Box::new(WebSocketReceiver { stream, message_tx }),
			message_rx,
		}
	}
}

struct WebSocketSender<S> {
	sink: SplitSink<WebSocketStream<S>, WsMessage>,
}

impl<S> Transport for WebSocketSender<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	fn send(&mut self, message: Value) -> TransportFuture<'_> {
		Box::pin(async move {
			let text = serde_json::to_string(&message)?;
			self.sink
				.send(WsMessage::Text(text))
				.await
				.map_err(|e| Error::TransportError(e.to_string()))
		})
	}

	fn close(&mut self) -> TransportFuture<'_> {
		Box::pin(async move { self.sink.close().await.map_err(|e| Error::TransportError(e.to_string())) })
	}
}

struct WebSocketReceiver<S> {
	stream: SplitStream<WebSocketStream<S>>,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<S> TransportReceiver for WebSocketReceiver<S>
where
	S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	fn run(self: Box<Self>) -> TransportFuture<'static> {
		Box::pin(async move {
			let WebSocketReceiver { mut stream, message_tx } = *self;
			while let Some(frame) = stream.next().await {
				let frame = frame.map_err(|e| Error::TransportError(e.to_string()))?;
				match decode(frame) {
					Ok(Frame::Json(value)) => {
						if message_tx.send(value).is_err() {
							break;
						}
					}
					Ok(Frame::Skip) => {}
					Ok(Frame::Close) => {
						tracing::debug!(target = "scm.transport", "websocket closed by browser");
						break;
					}
					Err(e) => tracing::warn!(target = "scm.transport", error = %e, "dropping undecodable frame"),
				}
			}
			Ok(())
		})
	}
}

/// Far end of an in-memory transport.
///
/// Whatever the connection sends shows up on `outgoing_rx`; values pushed
/// into `incoming_tx` are delivered to the connection as if the browser
/// had sent them. Dropping `incoming_tx` ends the connection.
pub struct MemoryPeer {
	pub outgoing_rx: mpsc::UnboundedReceiver<Value>,
	pub incoming_tx: mpsc::UnboundedSender<Value>,
}

impl MemoryPeer {
	/// Next message written by the connection, `None` once its sender closed.
	pub async fn recv(&mut self) -> Option<Value> {
		self.outgoing_rx.recv().await
	}

	/// Delivers a message to the connection.
	pub fn send(&self, message: Value) -> Result<()> {
		self.incoming_tx.send(message).map_err(|_| Error::ChannelClosed)
	}
}

/// Creates an in-memory transport and its peer.
pub fn memory() -> (TransportParts, MemoryPeer) {
	let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
	let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
	let (message_tx, message_rx) = mpsc::unbounded_channel();

	let parts = TransportParts {
		sender: Box::new(MemorySender { tx: Some(outgoing_tx) }),
		receiver: Box::new(MemoryReceiver { incoming_rx, message_tx }),
		message_rx,
	};
	(parts, MemoryPeer { outgoing_rx, incoming_tx })
}

struct MemorySender {
	tx: Option<mpsc::UnboundedSender<Value>>,
}

impl Transport for MemorySender {
	fn send(&mut self, message: Value) -> TransportFuture<'_> {
		let result = match &self.tx {
			Some(tx) => tx.send(message).map_err(|_| Error::ChannelClosed),
			None => Err(Error::ChannelClosed),
		};
		Box::pin(async move { result })
	}

	fn close(&mut self) -> TransportFuture<'_> {
		self.tx = None;
		Box::pin(async { Ok(()) })
	}
}

struct MemoryReceiver {
	incoming_rx: mpsc::UnboundedReceiver<Value>,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl TransportReceiver for MemoryReceiver {
	fn run(self: Box<Self>) -> TransportFuture<'static> {
		Box::pin(async move {
			let MemoryReceiver { mut incoming_rx, message_tx } = *self;
			while let Some(value) = incoming_rx.recv().await {
				if message_tx.send(value).is_err() {
					break;
				}
			}
			Ok(())
		})
	}
}
