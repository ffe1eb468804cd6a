//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a settings file could not be turned into usable settings.
///
/// Each variant names the offending key so the binary can point the user at
/// the exact line to fix.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not JSON, or a key has the wrong type.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A required URL is blank.
    #[error("{key} must not be empty")]
    Empty {
        /// Dotted settings key, e.g. `chat.serverUrl`.
        key: &'static str,
    },
    /// A numeric value is outside the accepted range.
    #[error("{key} = {value} is outside {min}..={max}")]
    OutOfRange {
        /// Dotted settings key, e.g. `chat.identityCheckIntervalMs`.
        key: &'static str,
        /// Value found after merging and env overrides.
        value: u64,
        /// Smallest accepted value.
        min: u64,
        /// Largest accepted value.
        max: u64,
    },
}

impl SettingsError {
    /// Dotted key of the offending value, when the error is about one.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::Empty { key } | Self::OutOfRange { key, .. } => Some(*key),
            Self::Read { .. } | Self::Json(_) => None,
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
