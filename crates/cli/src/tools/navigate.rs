//! `navigate`: load a URL in, or reload, a page target.
//!
//! The target's log buffer is emptied before the browser is asked to do
//! anything, so a failed navigation still leaves it empty.

use scm::TargetKind;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{BoxFut, ToolDef, port_schema, resolve_port, target_index_schema};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::session::{Session, TargetView, stable_id};
use crate::validate::{NavigationTarget, validate_url};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateRaw {
	pub url: String,
	#[serde(default)]
	pub target_index: usize,
	#[serde(default)]
	pub port: Option<Value>,
}

pub struct NavigateTool;

impl ToolDef for NavigateTool {
	const NAME: &'static str = "navigate";
	const TITLE: &'static str = "Navigate Page";
	const DESCRIPTION: &'static str = "Navigate to a URL or reload the current page. Use \"reload\" as URL to refresh.";

	type Raw = NavigateRaw;

	fn input_schema(config: &BridgeConfig) -> Value {
		json!({
			"type": "object",
			"properties": {
				"url": {
					"type": "string",
					"minLength": 1,
					"description": "Target URL or \"reload\" to refresh current page"
				},
				"targetIndex": target_index_schema(),
				"port": port_schema(config)
			},
			"required": ["url"]
		})
	}

	fn check(raw: &Self::Raw, _config: &BridgeConfig) -> std::result::Result<(), String> {
		if raw.url.is_empty() {
			return Err("url must not be empty".to_string());
		}
		Ok(())
	}

	fn execute(raw: Self::Raw, session: &Session) -> BoxFut<'_, Result<String>> {
		Box::pin(async move {
			let destination = validate_url(&raw.url)?;
			let port = resolve_port(raw.port.as_ref(), session.config())?;
			let browser = session.ensure_connection(port).await?;
			let view = TargetView::of(browser.as_ref());
			let index = raw.target_index;
			let target = view.resolve(index)?;

			let kind = target.kind();
			if kind != TargetKind::Page {
				return Err(BridgeError::InvalidArgument(format!(
					"Target [{index}] is a {kind}, not a page. Only page targets can be navigated."
				)));
			}

			let id = stable_id(target.as_ref());
			let Some(page) = session.acquire_page(target.as_ref(), &id).await? else {
				return Err(BridgeError::NotFound(format!("Cannot get page for target {index}.")));
			};

			session.logs().clear(&id.value);

			match destination {
				NavigationTarget::Reload => {
					tracing::info!(target = "scm.tools", id = %id.value, "reload");
					page.reload().await?;
					let url = page.current_url().await?;
					Ok(format!("Reloaded: {url}\n(Console logs cleared)"))
				}
				NavigationTarget::Url { url, insecure_http } => {
					tracing::info!(target = "scm.tools", id = %id.value, %url, insecure_http, "navigate");
					page.goto(&url).await?;
					let title = page.title().await?;
					let mut text = format!("Navigated to: {url}\nPage title: \"{title}\"\n(Console logs cleared)");
					if insecure_http {
						text.push_str("\nWarning: this page was loaded over plain HTTP from a non-local host.");
					}
					Ok(text)
				}
			}
		})
	}
}
