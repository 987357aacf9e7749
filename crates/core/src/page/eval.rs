//! JavaScript evaluation methods for [`Page`].

use scm_protocol::cdp::EvaluateResult;
use scm_runtime::{Error, Result};
use serde_json::{Value, json};

use super::Page;

impl Page {
	/// Evaluates an expression in the page and returns its value as JSON.
	///
	/// # Errors
	///
	/// Returns [`Error::Evaluation`] if the expression throws.
	pub async fn evaluate_json(&self, expression: &str) -> Result<Value> {
		let result: EvaluateResult = serde_json::from_value(
			self.send(
				"Runtime.evaluate",
				json!({"expression": expression, "returnByValue": true}),
			)
			.await?,
		)?;
		if let Some(details) = result.exception_details {
			return Err(Error::Evaluation(details.message()));
		}
		Ok(result.result.value.unwrap_or(Value::Null))
	}

	/// Evaluates an expression and renders the result as text.
	pub async fn evaluate_value(&self, expression: &str) -> Result<String> {
		Ok(match self.evaluate_json(expression).await? {
			Value::String(s) => s,
			Value::Null => String::new(),
			other => other.to_string(),
		})
	}

	/// Returns `document.title`.
	pub async fn title(&self) -> Result<String> {
		self.evaluate_value("document.title").await
	}

	/// Returns the main frame's current `location.href`.
	pub async fn current_url(&self) -> Result<String> {
		self.evaluate_value("location.href").await
	}
}
