//! Chrome DevTools Protocol payloads.
//!
//! Only the handful of domains the console bridge touches are modelled:
//! target discovery (`Target.*`), console capture (`Runtime.consoleAPICalled`),
//! navigation (`Page.navigate`, `Page.reload`) and expression evaluation.
//! Unknown fields are ignored so newer browsers stay compatible.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `/json/version` response subset from the browser's HTTP endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
	#[serde(rename = "webSocketDebuggerUrl")]
	pub web_socket_debugger_url: String,
	#[serde(rename = "Browser", default)]
	pub browser: Option<String>,
	#[serde(rename = "Protocol-Version", default)]
	pub protocol_version: Option<String>,
}

/// Description of a debuggable target as reported by the `Target` domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
	pub target_id: String,
	/// Raw CDP target type (`page`, `service_worker`, `iframe`, ...).
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub url: String,
	#[serde(default)]
	pub attached: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub opener_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub browser_context_id: Option<String>,
}

/// Result of `Target.getTargets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetsResult {
	pub target_infos: Vec<TargetInfo>,
}

/// Result of `Target.attachToTarget` with `flatten: true`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetResult {
	pub session_id: String,
}

/// `Target.targetCreated` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCreated {
	pub target_info: TargetInfo,
}

/// `Target.targetInfoChanged` event, fired on navigation and title changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfoChanged {
	pub target_info: TargetInfo,
}

/// `Target.targetDestroyed` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDestroyed {
	pub target_id: String,
}

/// Mirror object referencing a JavaScript value in the page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
	#[serde(rename = "type", default)]
	pub kind: String,
	#[serde(default)]
	pub subtype: Option<String>,
	#[serde(default)]
	pub value: Option<Value>,
	#[serde(default)]
	pub unserializable_value: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
}

impl RemoteObject {
	/// Renders the object the way a console shows a single argument.
	///
	/// Strings print without quotes, other primitives print their JSON form,
	/// and objects fall back to the description the browser supplied.
	pub fn display_text(&self) -> String {
		match &self.value {
			Some(Value::String(s)) => return s.clone(),
			Some(Value::Null) if self.kind == "object" => return "null".to_string(),
			Some(other) if self.kind != "object" && self.kind != "function" => return other.to_string(),
			_ => {}
		}
		if let Some(raw) = &self.unserializable_value {
			return raw.clone();
		}
		if let Some(description) = &self.description {
			return description.clone();
		}
		if self.kind == "undefined" {
			return "undefined".to_string();
		}
		match &self.subtype {
			Some(subtype) => format!("JSHandle@{subtype}"),
			None => format!("JSHandle@{}", self.kind),
		}
	}
}

/// `Runtime.consoleAPICalled` event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleApiCalled {
	/// Console call type (`log`, `warning`, `error`, ...).
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub args: Vec<RemoteObject>,
	#[serde(default)]
	pub execution_context_id: Option<i64>,
	/// Milliseconds since epoch, as reported by the browser.
	#[serde(default)]
	pub timestamp: Option<f64>,
}

impl ConsoleApiCalled {
	/// Joins the call's arguments with single spaces.
	pub fn text(&self) -> String {
		self.args.iter().map(RemoteObject::display_text).collect::<Vec<_>>().join(" ")
	}
}

/// Result of `Page.navigate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateResult {
	pub frame_id: String,
	/// Absent for same-document navigations.
	#[serde(default)]
	pub loader_id: Option<String>,
	#[serde(default)]
	pub error_text: Option<String>,
}

/// Details of an exception thrown while evaluating an expression.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
	pub text: String,
	#[serde(default)]
	pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
	/// Best human-readable message for the exception.
	pub fn message(&self) -> String {
		self.exception
			.as_ref()
			.and_then(|e| e.description.clone())
			.unwrap_or_else(|| self.text.clone())
	}
}

/// Result of `Runtime.evaluate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
	pub result: RemoteObject,
	#[serde(default)]
	pub exception_details: Option<ExceptionDetails>,
}
