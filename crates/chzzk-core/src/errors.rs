//! Protocol error types.

use thiserror::Error;

/// A frame or event entry that could not be interpreted.
///
/// Always recovered locally by skipping the smallest affected unit: the
/// entry, then the frame. Never fatal to a running session.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The payload was not valid JSON, or did not match the expected shape.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field was absent or had the wrong type.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The body shape does not match what the command code requires.
    #[error("unexpected body for cmd {cmd}: expected {expected}")]
    UnexpectedBody {
        /// Command code of the frame.
        cmd: i64,
        /// Shape that was expected.
        expected: &'static str,
    },

    /// The embedded profile blob could not be parsed.
    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    /// The send timestamp is outside the representable range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    /// The server refused the request.
    #[error("rejected by server (retCode {code}): {message}")]
    Rejected {
        /// Server return code.
        code: i64,
        /// Server return message.
        message: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
