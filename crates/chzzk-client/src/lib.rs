//! # chzzk-client
//!
//! Live chat client for a single Chzzk channel.
//!
//! - [`SessionManager`] resolves the channel identity and access token,
//!   connects, and runs the `connect` / `request_recent_chat` handshake
//! - [`EventDispatcher`] reads frames from the resulting [`Session`],
//!   answers pings, detects channel rotation, and writes chat and donation
//!   entries to a [`TranscriptSink`]
//! - [`transport`] abstracts the WebSocket so both can be driven without a
//!   network

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod session;
pub mod transcript;
pub mod transport;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use dispatcher::{ConnectionState, EventDispatcher, IdentityCheck, RunSummary};
pub use session::{Session, SessionError, SessionManager, SessionOptions};
pub use transcript::{FileTranscript, MemoryTranscript, TranscriptSink};
pub use transport::{ChatTransport, TransportConnector, TransportError, WsConnector};
