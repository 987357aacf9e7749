//! CDP runtime - transport and connection for the Chrome DevTools Protocol
//!
//! This crate provides the low-level plumbing between the console bridge and
//! a remotely debuggable browser:
//!
//! - **Transport**: bidirectional JSON frames over a WebSocket (or an
//!   in-memory channel pair for tests and embedders)
//! - **Connection**: request/response correlation by id, flattened session
//!   routing, and event broadcast to subscribers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  scm-core   │  Browser, Target, Page
//! └──────┬──────┘
//!        │ send / subscribe
//! ┌──────▼──────┐
//! │ scm-runtime │  This crate
//! │  ┌────────┐ │
//! │  │ Conn   │ │  id correlation, event fan-out
//! │  └────────┘ │
//! │  ┌────────┐ │
//! │  │ Trans  │ │  WebSocket / memory
//! │  └────────┘ │
//! └─────────────┘
//! ```

pub mod connection;
pub mod error;
pub mod transport;

pub use connection::{Connection, Event, Message, Request, Response};
pub use error::{Error, Result};
pub use transport::{MemoryPeer, Transport, TransportParts, TransportReceiver, WebSocketTransport};
