//! Drives the built binary over stdin/stdout.
//!
//! Only paths that fail before any browser is contacted are exercised, so
//! no Chrome is needed.

use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};

use serde_json::{Value, json};

fn run(requests: &[Value]) -> (Vec<Value>, i32) {
	let mut child = Command::new(env!("CARGO_BIN_EXE_simple-console-mcp"))
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::null())
		.spawn()
		.expect("spawn simple-console-mcp");

	{
		let mut stdin = child.stdin.take().unwrap();
		for request in requests {
			writeln!(stdin, "{request}").unwrap();
		}
	}

	let stdout = child.stdout.take().unwrap();
	let responses = BufReader::new(stdout)
		.lines()
		.map(|line| serde_json::from_str(&line.unwrap()).unwrap())
		.collect();
	let status = child.wait().unwrap();
	(responses, status.code().unwrap_or(-1))
}

fn call(id: i64, name: &str, arguments: Value) -> Value {
	json!({
		"jsonrpc": "2.0",
		"id": id,
		"method": "tools/call",
		"params": {"name": name, "arguments": arguments}
	})
}

fn text_of(response: &Value) -> &str {
	response["result"]["content"][0]["text"].as_str().unwrap()
}

#[test]
fn handshake_and_tool_listing() {
	let (responses, code) = run(&[
		json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {
			"protocolVersion": "2024-11-05",
			"capabilities": {},
			"clientInfo": {"name": "stdio-test", "version": "0"}
		}}),
		json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
		json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
	]);

	assert_eq!(code, 0);
	assert_eq!(responses.len(), 2);
	assert_eq!(responses[0]["result"]["serverInfo"]["name"], "simple-console-mcp");
	assert_eq!(responses[0]["result"]["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));

	let names: Vec<_> = responses[1]["result"]["tools"]
		.as_array()
		.unwrap()
		.iter()
		.map(|tool| tool["name"].as_str().unwrap().to_string())
		.collect();
	assert_eq!(names, ["list_targets", "get_console_logs", "navigate"]);
}

#[test]
fn rejected_inputs_come_back_as_error_text() {
	let (responses, code) = run(&[
		call(1, "navigate", json!({"url": "ftp://x"})),
		call(2, "list_targets", json!({"port": 80})),
		call(3, "navigate", json!({"url": "javascript:alert(1)"})),
	]);

	assert_eq!(code, 0);
	let by_id = |id: i64| responses.iter().find(|r| r["id"] == id).unwrap();

	assert!(text_of(by_id(1)).starts_with("Error: Invalid URL protocol: ftp:"));
	assert_eq!(
		text_of(by_id(2)),
		"Error: Invalid port: 80. Must be integer between 1024-65535"
	);
	assert!(text_of(by_id(3)).starts_with("Error: Invalid URL protocol: javascript:"));
}

#[test]
fn unknown_method_is_a_jsonrpc_error() {
	let (responses, _) = run(&[json!({"jsonrpc": "2.0", "id": 9, "method": "prompts/list"})]);
	assert_eq!(responses[0]["error"]["code"], -32601);
}
