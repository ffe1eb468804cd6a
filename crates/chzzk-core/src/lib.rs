//! # chzzk-core
//!
//! Foundation types for the Chzzk chat client.
//!
//! This crate provides the shared vocabulary that the other crates depend on:
//!
//! - **Branded IDs**: `ChannelId`, `SessionId`, `UserIdHash`, `StreamerId` as
//!   newtypes so a channel id is never passed where a session id is expected
//! - **Protocol**: the command registry, outbound control messages, and
//!   inbound [`Frame`](protocol::Frame) classification
//! - **Events**: chat/donation [`EventEntry`](events::EventEntry) parsing and
//!   the [`LogRecord`](events::LogRecord) transcript line
//! - **Errors**: [`ProtocolError`] for malformed frames and entries
//! - **Logging**: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod protocol;

pub use errors::ProtocolError;
pub use events::{ChatCategory, EventEntry, Labels, Locale, LogRecord, Sender, format_elapsed};
pub use ids::{AccessToken, ChannelId, SessionId, StreamerId, UserIdHash};
pub use protocol::{ChatCmd, Envelope, Frame};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
