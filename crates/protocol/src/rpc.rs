//! JSON-RPC 2.0 envelopes and the MCP tool surface spoken over stdio.
//!
//! Each message is a single line of JSON. Requests carry an `id`;
//! notifications do not and never receive a response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Request identifier; JSON-RPC allows numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
	Number(i64),
	String(String),
}

/// Any message received from the client (request or notification).
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
	#[serde(default)]
	pub jsonrpc: Option<String>,
	#[serde(default)]
	pub id: Option<RequestId>,
	pub method: String,
	#[serde(default)]
	pub params: Option<Value>,
}

impl IncomingMessage {
	/// Notifications carry no id and expect no reply.
	pub fn is_notification(&self) -> bool {
		self.id.is_none()
	}
}

/// Response to a request. Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
	pub jsonrpc: String,
	pub id: Option<RequestId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<RpcError>,
}

impl Response {
	pub fn success(id: Option<RequestId>, result: Value) -> Self {
		Self {
			jsonrpc: JSONRPC_VERSION.to_string(),
			id,
			result: Some(result),
			error: None,
		}
	}

	pub fn failure(id: Option<RequestId>, error: RpcError) -> Self {
		Self {
			jsonrpc: JSONRPC_VERSION.to_string(),
			id,
			result: None,
			error: Some(error),
		}
	}
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
	pub code: i64,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

impl RpcError {
	pub const PARSE_ERROR: i64 = -32700;
	pub const INVALID_REQUEST: i64 = -32600;
	pub const METHOD_NOT_FOUND: i64 = -32601;
	pub const INVALID_PARAMS: i64 = -32602;
	pub const INTERNAL_ERROR: i64 = -32603;

	pub fn new(code: i64, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
			data: None,
		}
	}

	pub fn parse_error(detail: impl std::fmt::Display) -> Self {
		Self::new(Self::PARSE_ERROR, format!("Parse error: {detail}"))
	}

	pub fn method_not_found(method: &str) -> Self {
		Self::new(Self::METHOD_NOT_FOUND, format!("Method not found: {method}"))
	}

	pub fn invalid_params(message: impl Into<String>) -> Self {
		Self::new(Self::INVALID_PARAMS, message)
	}

	pub fn internal(message: impl Into<String>) -> Self {
		Self::new(Self::INTERNAL_ERROR, message)
	}
}

/// Server identity reported during `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
	pub name: String,
	pub version: String,
}

/// Result of `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
	pub protocol_version: String,
	pub capabilities: Value,
	pub server_info: ServerInfo,
}

/// Entry returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
	pub name: String,
	pub title: String,
	pub description: String,
	pub input_schema: Value,
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallToolParams {
	pub name: String,
	#[serde(default)]
	pub arguments: Option<Value>,
}

/// Content block inside a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
	Text { text: String },
}

/// Result of `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
	pub content: Vec<Content>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub is_error: Option<bool>,
}

impl CallToolResult {
	/// Single text block result.
	pub fn text(text: impl Into<String>) -> Self {
		Self {
			content: vec![Content::Text { text: text.into() }],
			is_error: None,
		}
	}

	/// Single text block flagged as an error.
	pub fn error_text(text: impl Into<String>) -> Self {
		Self {
			content: vec![Content::Text { text: text.into() }],
			is_error: Some(true),
		}
	}

	/// Concatenated text of every block.
	pub fn joined_text(&self) -> String {
		self.content
			.iter()
			.map(|Content::Text { text }| text.as_str())
			.collect::<Vec<_>>()
			.join("\n")
	}
}
