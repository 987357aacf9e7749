//! `get_console_logs`: buffered console output of one target.
//!
//! The first call for a target attaches the console listener, so it
//! usually reports an empty buffer.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{BoxFut, ToolDef, port_schema, resolve_port, target_index_schema};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::session::{LogFilter, Session, TargetView, stable_id};

pub const DEFAULT_MAX_LINES: usize = 50;

const EMPTY: &str = "No logs yet. Interact with the page to generate console output.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleLogsRaw {
	#[serde(default)]
	pub target_index: usize,
	#[serde(default = "default_max_lines")]
	pub max_lines: usize,
	#[serde(default)]
	pub filter: LogFilter,
	#[serde(default)]
	pub port: Option<Value>,
}

impl Default for ConsoleLogsRaw {
	fn default() -> Self {
		Self {
			target_index: 0,
			max_lines: DEFAULT_MAX_LINES,
			filter: LogFilter::All,
			port: None,
		}
	}
}

fn default_max_lines() -> usize {
	DEFAULT_MAX_LINES
}

pub struct ConsoleLogsTool;

impl ToolDef for ConsoleLogsTool {
	const NAME: &'static str = "get_console_logs";
	const TITLE: &'static str = "Get Console Logs";
	const DESCRIPTION: &'static str = "Get console logs from a browser target. Starts monitoring on first call.";

	type Raw = ConsoleLogsRaw;

	fn input_schema(config: &BridgeConfig) -> Value {
		json!({
			"type": "object",
			"properties": {
				"targetIndex": target_index_schema(),
				"maxLines": {
					"type": "integer",
					"minimum": 1,
					"maximum": config.max_logs,
					"default": DEFAULT_MAX_LINES,
					"description": "Maximum lines to return"
				},
				"filter": {
					"type": "string",
					"enum": LogFilter::NAMES,
					"default": "all",
					"description": "Filter by log type"
				},
				"port": port_schema(config)
			}
		})
	}

	fn check(raw: &Self::Raw, config: &BridgeConfig) -> std::result::Result<(), String> {
		if raw.max_lines == 0 || raw.max_lines > config.max_logs {
			return Err(format!(
				"maxLines must be between 1 and {}, got {}",
				config.max_logs, raw.max_lines
			));
		}
		Ok(())
	}

	fn execute(raw: Self::Raw, session: &Session) -> BoxFut<'_, Result<String>> {
		Box::pin(async move {
			let port = resolve_port(raw.port.as_ref(), session.config())?;
			let browser = session.ensure_connection(port).await?;
			let view = TargetView::of(browser.as_ref());
			let target = view.resolve(raw.target_index)?;
			let id = stable_id(target.as_ref());
			let display_url = target.url();

			if session.acquire_page(target.as_ref(), &id).await?.is_none() {
				return Err(BridgeError::NotFound(format!(
					"Cannot get page for target {}. It might be a non-page target.",
					raw.target_index
				)));
			}

			let report = session.logs().read(&id.value, raw.max_lines, raw.filter);
			tracing::info!(
				target = "scm.tools",
				id = %id.value,
				shown = report.shown,
				total = report.total,
				filter = %raw.filter,
				"get_console_logs"
			);

			let body = if report.text.is_empty() { EMPTY } else { report.text.as_str() };
			Ok(format!(
				"=== Console Logs for {display_url} ===\n{body}\n(showing {} of {} matching logs, {} total, filter: {})",
				report.shown, report.matched, report.total, raw.filter
			))
		})
	}
}

#[cfg(test)]
mod tests {
	use scm::{ConsoleMessage, ConsoleMessageKind, TargetKind};

	use super::*;
	use crate::testing::{MockTarget, mock_session};

	fn raw(max_lines: usize, filter: LogFilter) -> ConsoleLogsRaw {
		ConsoleLogsRaw {
			max_lines,
			filter,
			..Default::default()
		}
	}

	#[tokio::test]
	async fn first_call_starts_monitoring() {
		let target = MockTarget::page("T1", "https://a.test/");
		let (session, _browser) = mock_session(vec![target.clone()]);

		let text = ConsoleLogsTool::execute(ConsoleLogsRaw::default(), &session).await.unwrap();
		assert_eq!(
			text,
			format!("=== Console Logs for https://a.test/ ===\n{EMPTY}\n(showing 0 of 0 matching logs, 0 total, filter: all)")
		);
		assert_eq!(target.mock_page().unwrap().listener_count(), 1);
	}

	#[tokio::test]
	async fn returns_the_last_lines_with_counts() {
		let target = MockTarget::page("T1", "https://a.test/");
		let (session, _browser) = mock_session(vec![target.clone()]);
		ConsoleLogsTool::execute(ConsoleLogsRaw::default(), &session).await.unwrap();

		let page = target.mock_page().unwrap();
		for (i, kind) in [
			ConsoleMessageKind::Log,
			ConsoleMessageKind::Error,
			ConsoleMessageKind::Log,
			ConsoleMessageKind::Warning,
			ConsoleMessageKind::Error,
		]
		.into_iter()
		.enumerate()
		{
			page.emit(ConsoleMessage::new(kind, format!("message {i}")));
		}

		let text = ConsoleLogsTool::execute(raw(2, LogFilter::All), &session).await.unwrap();
		let lines: Vec<_> = text.lines().collect();
		assert_eq!(lines.len(), 4);
		assert!(lines[1].ends_with("] WARN: message 3"));
		assert!(lines[2].ends_with("] ERROR: message 4"));
		assert_eq!(lines[3], "(showing 2 of 5 matching logs, 5 total, filter: all)");

		let text = ConsoleLogsTool::execute(raw(50, LogFilter::Error), &session).await.unwrap();
		assert!(text.ends_with("(showing 2 of 2 matching logs, 5 total, filter: error)"));
	}

	#[tokio::test]
	async fn logs_follow_the_target_across_navigation() {
		let target = MockTarget::page("T1", "https://a.test/");
		let (session, _browser) = mock_session(vec![target.clone()]);
		ConsoleLogsTool::execute(ConsoleLogsRaw::default(), &session).await.unwrap();

		target.set_url("https://a.test/next");
		target.mock_page().unwrap().emit(ConsoleMessage::new(ConsoleMessageKind::Info, "after"));

		let text = ConsoleLogsTool::execute(ConsoleLogsRaw::default(), &session).await.unwrap();
		assert!(text.starts_with("=== Console Logs for https://a.test/next ==="));
		assert!(text.contains("] INFO: after"));
		assert_eq!(target.page_requests(), 1);
	}

	#[tokio::test]
	async fn out_of_range_index_is_not_found() {
		let (session, _browser) = mock_session(vec![MockTarget::page("T1", "https://a.test/")]);
		let raw = ConsoleLogsRaw {
			target_index: 3,
			..Default::default()
		};

		let err = ConsoleLogsTool::execute(raw, &session).await.unwrap_err();
		assert!(matches!(err, BridgeError::NotFound(_)));
	}

	#[tokio::test]
	async fn pageless_target_is_reported() {
		let (session, _browser) = mock_session(vec![MockTarget::new(
			"W1",
			TargetKind::ServiceWorker,
			"https://a.test/sw.js",
		)]);

		let err = ConsoleLogsTool::execute(ConsoleLogsRaw::default(), &session).await.unwrap_err();
		assert_eq!(
			err.to_string(),
			"Cannot get page for target 0. It might be a non-page target."
		);
	}

	#[test]
	fn max_lines_is_bounded_by_buffer_capacity() {
		let config = BridgeConfig::default();
		assert!(ConsoleLogsTool::check(&raw(1, LogFilter::All), &config).is_ok());
		assert!(ConsoleLogsTool::check(&raw(500, LogFilter::All), &config).is_ok());
		assert!(ConsoleLogsTool::check(&raw(0, LogFilter::All), &config).is_err());
		assert!(ConsoleLogsTool::check(&raw(501, LogFilter::All), &config).is_err());
	}
}
