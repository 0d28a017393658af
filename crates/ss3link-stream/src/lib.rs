//! SimpliSafe event-stream client.
//!
//! A WebSocket session that authenticates with the current bearer token and
//! delivers security-system events to an injected [`EventHandler`].
//!
//! ```text
//! Disconnected ──connect──▶ Connected ──hello/identify──▶ Identified ──subscribed──▶ Subscribed
//!       ▲                                                                               │
//!       └──────────────────────── close / error / EOF (on_disconnect) ◀─────────────────┘
//! ```
//!
//! The client never reconnects by itself and never spawns a task. The host's
//! loop calls [`EventStreamClient::poll`] on a short tick and reconnects when
//! [`EventStreamClient::state`] falls back to `Disconnected`.

pub mod client;
pub mod error;
pub mod protocol;
pub mod session;

pub use client::{DEFAULT_STREAM_URL, EventHandler, EventStreamClient, StreamConfig};
pub use error::{Result, StreamError};
pub use protocol::{Envelope, MessageKind, StreamEvent};
pub use session::{Action, Session, StreamState};
