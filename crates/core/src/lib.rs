//! Minimal Chrome DevTools Protocol client.
//!
//! [`Browser`] owns one WebSocket connection and a live registry of the
//! browser's targets. A [`Target`] can be attached to obtain a [`Page`],
//! which streams console messages and can navigate or reload.
//!
//! ```ignore
//! let browser = scm::Browser::connect("http://localhost:9222").await?;
//! for target in browser.targets() {
//!     println!("{}: {}", target.kind(), target.url());
//! }
//! ```

mod browser;
pub mod events;
mod page;
mod target;
pub mod task;

pub use browser::Browser;
pub use events::ConsoleSubscription;
pub use page::{ConsoleMessage, ConsoleMessageKind, Page};
pub use scm_protocol::cdp::TargetInfo;
pub use scm_runtime::transport::{MemoryPeer, memory};
pub use scm_runtime::{Error, Result, TransportParts, WebSocketTransport};
pub use target::{Target, TargetKind};
pub use task::{TaskFailure, TaskMonitor};
