//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a settings file only needs the keys it wants to change.

mod connection;
mod transcript;

pub use connection::*;
pub use transcript::*;

use serde::{Deserialize, Serialize};

/// Root settings type for the chat client.
///
/// Loaded from `~/.chzzk-chat/settings.json` with defaults applied for
/// missing fields. Environment variables can override specific values.
///
/// ```json
/// {
///   "chat": { "reconnectDelayMs": 5000 },
///   "transcript": { "locale": "en" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChzzkSettings {
    /// Settings schema version.
    pub version: String,
    /// REST endpoints and HTTP client behaviour.
    pub api: ApiSettings,
    /// Chat server connection behaviour.
    pub chat: ConnectionSettings,
    /// Transcript output.
    pub transcript: TranscriptSettings,
    /// Operational logging.
    pub logging: LoggingSettings,
}

impl Default for ChzzkSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            api: ApiSettings::default(),
            chat: ConnectionSettings::default(),
            transcript: TranscriptSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Filter used when neither the settings file nor `RUST_LOG` set one.
pub const DEFAULT_LOG_FILTER: &str = "warn,chzzk_client=info";

/// Operational log settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    ///
    /// The default keeps handshake progress and reconnects from the client
    /// crate visible while everything else stays at `warn`.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_defaults() {
        let s = ChzzkSettings::default();
        assert_eq!(s.version, "0.1.0");
        assert_eq!(s.logging.level, "warn,chzzk_client=info");
        assert_eq!(s.chat.recent_message_count, 50);
    }

    #[test]
    fn root_serde_sections() {
        let json = serde_json::to_value(ChzzkSettings::default()).unwrap();
        for key in ["api", "chat", "transcript", "logging"] {
            assert!(json.get(key).is_some(), "missing section {key}");
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: ChzzkSettings =
            serde_json::from_str(r#"{"logging": {"level": "debug"}}"#).unwrap();
        assert_eq!(s.logging.level, "debug");
        assert_eq!(s.chat.device_type, 2001);
    }
}
