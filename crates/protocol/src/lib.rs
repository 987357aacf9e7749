//! Wire types shared by the simple-console-mcp crates.
//!
//! - [`cdp`] - Chrome DevTools Protocol payloads (targets, console events, navigation)
//! - [`rpc`] - JSON-RPC 2.0 envelopes and MCP tool-call shapes spoken on stdio

pub mod cdp;
pub mod rpc;

pub use cdp::{
	AttachToTargetResult, ConsoleApiCalled, EvaluateResult, ExceptionDetails, GetTargetsResult, NavigateResult,
	RemoteObject, TargetCreated, TargetDestroyed, TargetInfo, TargetInfoChanged, VersionInfo,
};
pub use rpc::{
	CallToolParams, CallToolResult, Content, IncomingMessage, InitializeResult, RequestId, Response, RpcError,
	ServerInfo, ToolDescriptor,
};
