//! Newline-delimited JSON-RPC 2.0 over a byte stream (stdin/stdout in the
//! binary).
//!
//! Requests are read one line at a time. `tools/call` runs on its own task
//! so slow browser work never blocks the reader; every response goes
//! through a single writer task so lines never interleave.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use scm_protocol::rpc::{
	CallToolParams, IncomingMessage, InitializeResult, PROTOCOL_VERSION, RequestId, Response, RpcError, ServerInfo,
	ToolDescriptor,
};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::session::Session;
use crate::tools::ToolRegistry;

pub const SERVER_NAME: &str = "simple-console-mcp";

/// MCP server over one request stream.
pub struct McpServer {
	registry: Arc<ToolRegistry>,
}

impl McpServer {
	pub fn new(registry: ToolRegistry) -> Self {
		Self {
			registry: Arc::new(registry),
		}
	}

	pub fn session(&self) -> &Arc<Session> {
		self.registry.session()
	}

	/// Serves until `reader` reaches end of input.
	///
	/// Returns an error when the stream fails or any task panics, be it a
	/// tool call or background browser work. Calls still running at end of
	/// input are allowed to finish.
	pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<()>
	where
		R: AsyncRead + Unpin,
		W: AsyncWrite + Unpin + Send + 'static,
	{
		let (out_tx, out_rx) = mpsc::unbounded_channel::<Response>();
		let writer_task = tokio::spawn(write_responses(writer, out_rx));

		let mut lines = BufReader::new(reader).lines();
		let mut tasks = JoinSet::new();
		let mut failures = self.session().task_failures();

		loop {
			tokio::select! {
				line = lines.next_line() => {
					let Some(line) = line.context("Failed reading request")? else {
						tracing::info!(target = "scm.server", "end of input");
						break;
					};
					let line = line.trim();
					if line.is_empty() {
						continue;
					}
					self.handle_line(line, &out_tx, &mut tasks);
				}
				Some(joined) = tasks.join_next(), if !tasks.is_empty() => check_task(joined)?,
				Ok(failure) = failures.recv() => {
					return Err(anyhow!("Background task {} panicked: {}", failure.task, failure.message));
				}
			}
		}

		while let Some(joined) = tasks.join_next().await {
			check_task(joined)?;
		}

		drop(out_tx);
		writer_task.await.context("Response writer task failed")??;
		Ok(())
	}

	fn handle_line(&self, line: &str, out: &mpsc::UnboundedSender<Response>, tasks: &mut JoinSet<()>) {
		let value: Value = match serde_json::from_str(line) {
			Ok(value) => value,
			Err(err) => {
				tracing::warn!(target = "scm.server", error = %err, "unparseable request line");
				send(out, Response::failure(None, RpcError::parse_error(err)));
				return;
			}
		};

		let message: IncomingMessage = match serde_json::from_value(value.clone()) {
			Ok(message) => message,
			Err(err) => {
				let id = value.get("id").cloned().and_then(|id| serde_json::from_value::<RequestId>(id).ok());
				send(
					out,
					Response::failure(id, RpcError::new(RpcError::INVALID_REQUEST, format!("Invalid request: {err}"))),
				);
				return;
			}
		};

		if message.is_notification() {
			tracing::debug!(target = "scm.server", method = %message.method, "notification");
			return;
		}

		let id = message.id.clone();
		tracing::debug!(target = "scm.server", method = %message.method, ?id, "request");
		match message.method.as_str() {
			"initialize" => send(out, success(id, &initialize_result())),
			"ping" => send(out, Response::success(id, json!({}))),
			"tools/list" => {
				let tools = self.registry.descriptors();
				send(out, success(id, &ListToolsResult { tools }));
			}
			"tools/call" => {
				let params = message
					.params
					.map(serde_json::from_value::<CallToolParams>)
					.transpose()
					.map_err(|e| e.to_string())
					.and_then(|p| p.ok_or_else(|| "missing params".to_string()));
				let params = match params {
					Ok(params) => params,
					Err(detail) => {
						send(out, Response::failure(id, RpcError::invalid_params(format!("Invalid params: {detail}"))));
						return;
					}
				};

				let registry = Arc::clone(&self.registry);
				let out = out.clone();
				tasks.spawn(async move {
					let response = match registry.call(&params.name, params.arguments).await {
						Ok(result) => success(id, &result),
						Err(error) => Response::failure(id, error),
					};
					send(&out, response);
				});
			}
			other => send(out, Response::failure(id, RpcError::method_not_found(other))),
		}
	}
}

#[derive(Serialize)]
struct ListToolsResult {
	tools: Vec<ToolDescriptor>,
}

fn initialize_result() -> InitializeResult {
	InitializeResult {
		protocol_version: PROTOCOL_VERSION.to_string(),
		capabilities: json!({ "tools": {} }),
		server_info: ServerInfo {
			name: SERVER_NAME.to_string(),
			version: env!("CARGO_PKG_VERSION").to_string(),
		},
	}
}

fn success<T: Serialize>(id: Option<RequestId>, result: &T) -> Response {
	match serde_json::to_value(result) {
		Ok(value) => Response::success(id, value),
		Err(err) => Response::failure(id, RpcError::internal(format!("Failed to serialize result: {err}"))),
	}
}

fn send(out: &mpsc::UnboundedSender<Response>, response: Response) {
	if out.send(response).is_err() {
		tracing::warn!(target = "scm.server", "response dropped, writer is gone");
	}
}

fn check_task(joined: std::result::Result<(), tokio::task::JoinError>) -> Result<()> {
	match joined {
		Ok(()) => Ok(()),
		Err(err) if err.is_panic() => Err(anyhow!("Tool handler panicked: {err}")),
		Err(err) => {
			tracing::debug!(target = "scm.server", error = %err, "tool task cancelled");
			Ok(())
		}
	}
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Response>) -> Result<()>
where
	W: AsyncWrite + Unpin,
{
	while let Some(response) = rx.recv().await {
		write_response(&mut writer, &response).await?;
	}
	Ok(())
}

async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
	W: AsyncWrite + Unpin,
{
	let payload = serde_json::to_string(response).context("Failed to serialize response")?;
	writer
		.write_all(format!("{payload}\n").as_bytes())
		.await
		.context("Failed writing response")?;
	writer.flush().await.context("Failed flushing response")?;
	Ok(())
}
