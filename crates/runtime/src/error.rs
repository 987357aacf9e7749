//! Error types for the CDP runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the browser.
#[derive(Debug, Error)]
pub enum Error {
	/// Could not reach the browser's debugging endpoint.
	#[error("Failed to connect to browser: {0}")]
	ConnectionFailed(String),

	/// HTTP discovery (`/json/version`) failed.
	#[error("HTTP error: {0}")]
	Http(String),

	/// Transport-level error (WebSocket framing or I/O).
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Protocol-level error (malformed or unexpected CDP message).
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// Error object returned by the browser for a command.
	#[error("{message} (code {code})")]
	Remote { code: i64, message: String },

	/// The page refused or failed a navigation.
	#[error("Navigation to {url} failed: {reason}")]
	Navigation { url: String, reason: String },

	/// An evaluated expression threw.
	#[error("Evaluation failed: {0}")]
	Evaluation(String),

	/// The connection closed before the operation completed.
	#[error("Connection closed")]
	ChannelClosed,

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}
