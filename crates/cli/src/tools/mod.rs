//! The three MCP tools and their dispatch.
//!
//! Each tool is a [`ToolDef`]: raw arguments deserialized from the call,
//! a schema check, and an async body run against the shared [`Session`].
//! Failures inside a body become ordinary `Error: <message>` results; only
//! an unknown tool name is a protocol error.

mod console_logs;
mod list_targets;
mod navigate;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use scm_protocol::rpc::{CallToolResult, RpcError, ToolDescriptor};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

pub use console_logs::{ConsoleLogsRaw, ConsoleLogsTool};
pub use list_targets::{ListTargetsRaw, ListTargetsTool};
pub use navigate::{NavigateRaw, NavigateTool};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::session::Session;
use crate::validate::{MAX_PORT, MIN_PORT, validate_port};

pub type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Contract shared by every tool.
pub trait ToolDef {
	const NAME: &'static str;
	const TITLE: &'static str;
	const DESCRIPTION: &'static str;

	type Raw: DeserializeOwned + Serialize + Send + 'static;

	/// JSON Schema advertised in `tools/list`.
	fn input_schema(config: &BridgeConfig) -> Value;

	/// Constraints serde cannot express. The message is shown to the caller.
	fn check(_raw: &Self::Raw, _config: &BridgeConfig) -> std::result::Result<(), String> {
		Ok(())
	}

	fn execute(raw: Self::Raw, session: &Session) -> BoxFut<'_, Result<String>>;
}

fn descriptor<T: ToolDef>(config: &BridgeConfig) -> ToolDescriptor {
	ToolDescriptor {
		name: T::NAME.to_string(),
		title: T::TITLE.to_string(),
		description: T::DESCRIPTION.to_string(),
		input_schema: T::input_schema(config),
	}
}

/// Schema fragment for the `port` argument shared by all tools.
pub(crate) fn port_schema(config: &BridgeConfig) -> Value {
	json!({
		"type": "integer",
		"minimum": MIN_PORT,
		"maximum": MAX_PORT,
		"default": config.default_port,
		"description": "Chrome CDP port"
	})
}

/// Schema fragment for `targetIndex`.
pub(crate) fn target_index_schema() -> Value {
	json!({
		"type": "integer",
		"minimum": 0,
		"default": 0,
		"description": "Target index from list_targets"
	})
}

/// Port from the call, or the configured default when omitted.
pub(crate) fn resolve_port(raw: Option<&Value>, config: &BridgeConfig) -> Result<u16> {
	match raw {
		Some(value) => validate_port(value),
		None => Ok(config.default_port),
	}
}

/// Routes `tools/call` requests to the tool bodies.
pub struct ToolRegistry {
	session: Arc<Session>,
}

impl ToolRegistry {
	pub fn new(session: Arc<Session>) -> Self {
		Self { session }
	}

	pub fn session(&self) -> &Arc<Session> {
		&self.session
	}

	/// Descriptors in a fixed order.
	pub fn descriptors(&self) -> Vec<ToolDescriptor> {
		let config = self.session.config();
		vec![
			descriptor::<ListTargetsTool>(config),
			descriptor::<ConsoleLogsTool>(config),
			descriptor::<NavigateTool>(config),
		]
	}

	/// Runs tool `name`. Only an unknown name is an `Err`.
	pub async fn call(&self, name: &str, arguments: Option<Value>) -> std::result::Result<CallToolResult, RpcError> {
		let session = self.session.as_ref();
		if name == ListTargetsTool::NAME {
			Ok(run::<ListTargetsTool>(session, arguments).await)
		} else if name == ConsoleLogsTool::NAME {
			Ok(run::<ConsoleLogsTool>(session, arguments).await)
		} else if name == NavigateTool::NAME {
			Ok(run::<NavigateTool>(session, arguments).await)
		} else {
			Err(RpcError::invalid_params(format!("Unknown tool: {name}")))
		}
	}
}

async fn run<T: ToolDef>(session: &Session, arguments: Option<Value>) -> CallToolResult {
	let inputs = match arguments {
		None | Some(Value::Null) => json!({}),
		Some(value) => value,
	};

	let raw = serde_json::from_value::<T::Raw>(inputs.clone())
		.map_err(|e| e.to_string())
		.and_then(|raw| T::check(&raw, session.config()).map(|()| raw));
	let raw = match raw {
		Ok(raw) => raw,
		Err(detail) => {
			tracing::warn!(target = "scm.tools", tool = T::NAME, %inputs, %detail, "rejected arguments");
			return CallToolResult::error_text(format!("Error: Invalid arguments for {}: {detail}", T::NAME));
		}
	};

	tracing::debug!(target = "scm.tools", tool = T::NAME, %inputs, "tool call");
	match T::execute(raw, session).await {
		Ok(text) => CallToolResult::text(text),
		Err(err) => {
			tracing::error!(target = "scm.tools", tool = T::NAME, %inputs, kind = err.kind(), error = %err, "tool failed");
			CallToolResult::text(format!("Error: {err}"))
		}
	}
}
