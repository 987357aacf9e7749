//! `list_targets`: allowed targets of the connected browser, by index.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{BoxFut, ToolDef, port_schema, resolve_port};
use crate::config::BridgeConfig;
use crate::error::Result;
use crate::session::{Session, TargetView};

const EMPTY: &str = "No targets found. Open a page in Chrome first.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListTargetsRaw {
	#[serde(default)]
	pub port: Option<Value>,
}

pub struct ListTargetsTool;

impl ToolDef for ListTargetsTool {
	const NAME: &'static str = "list_targets";
	const TITLE: &'static str = "List Browser Targets";
	const DESCRIPTION: &'static str = "List all available browser targets (pages, service workers, etc.)";

	type Raw = ListTargetsRaw;

	fn input_schema(config: &BridgeConfig) -> Value {
		json!({
			"type": "object",
			"properties": {
				"port": port_schema(config)
			}
		})
	}

	fn execute(raw: Self::Raw, session: &Session) -> BoxFut<'_, Result<String>> {
		Box::pin(async move {
			let port = resolve_port(raw.port.as_ref(), session.config())?;
			let browser = session.ensure_connection(port).await?;
			let view = TargetView::of(browser.as_ref());
			tracing::info!(target = "scm.tools", port, targets = view.len(), "list_targets");

			let body = if view.is_empty() { EMPTY.to_string() } else { view.render() };
			Ok(format!("Available targets:\n{body}"))
		})
	}
}

#[cfg(test)]
mod tests {
	use scm::TargetKind;

	use super::*;
	use crate::testing::{MockTarget, mock_session};

	#[tokio::test]
	async fn lists_allowed_targets_by_index() {
		let (session, _browser) = mock_session(vec![
			MockTarget::page("T1", "https://a.test/"),
			MockTarget::new("F1", TargetKind::Other, "https://ads.test/frame"),
			MockTarget::new("W1", TargetKind::ServiceWorker, "https://a.test/sw.js"),
		]);

		let text = ListTargetsTool::execute(ListTargetsRaw::default(), &session).await.unwrap();
		assert_eq!(
			text,
			"Available targets:\n[0] page: https://a.test/\n[1] service_worker: https://a.test/sw.js"
		);
	}

	#[tokio::test]
	async fn empty_browser_gets_a_hint() {
		let (session, _browser) = mock_session(vec![]);

		let text = ListTargetsTool::execute(ListTargetsRaw::default(), &session).await.unwrap();
		assert_eq!(text, format!("Available targets:\n{EMPTY}"));
	}

	#[tokio::test]
	async fn port_is_validated_before_connecting() {
		let (session, _browser) = mock_session(vec![]);
		let raw = ListTargetsRaw {
			port: Some(json!("abc")),
		};

		let err = ListTargetsTool::execute(raw, &session).await.unwrap_err();
		assert_eq!(err.to_string(), "Invalid port: abc. Must be integer between 1024-65535");
		assert!(session.pages().is_empty());
	}
}
