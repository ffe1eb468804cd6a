//! REST API and chat server connection settings.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Accepted `api.timeoutMs`.
pub const API_TIMEOUT_MS: RangeInclusive<u64> = 1_000..=120_000;
/// Accepted `chat.recentMessageCount`. The server caps the backlog at 50.
pub const RECENT_MESSAGE_COUNT: RangeInclusive<u32> = 0..=50;
/// Accepted `chat.reconnectDelayMs`.
pub const RECONNECT_DELAY_MS: RangeInclusive<u64> = 0..=600_000;
/// Accepted `chat.identityCheckIntervalMs`.
pub const IDENTITY_CHECK_INTERVAL_MS: RangeInclusive<u64> = 1_000..=3_600_000;

/// Default browser-like user agent. The platform rejects bare library agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// REST endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Base URL for live-status, channel and polling endpoints.
    pub chzzk_base_url: String,
    /// Base URL for user status and chat access-token endpoints.
    pub game_base_url: String,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            chzzk_base_url: "https://api.chzzk.naver.com".to_string(),
            game_base_url: "https://comm-api.game.naver.com".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// How channel-identity rotation is detected while the run loop is reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityCheckMode {
    /// Re-fetch the channel identity after answering each server ping.
    #[default]
    Ping,
    /// Re-fetch on an independent timer (`identityCheckIntervalMs`).
    Interval,
}

/// Chat server connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    /// WebSocket URL of the chat server.
    pub server_url: String,
    /// Device type sent in the connect message.
    pub device_type: u32,
    /// Number of recent messages requested after connecting.
    pub recent_message_count: u32,
    /// Fixed pause between failed re-establish attempts.
    pub reconnect_delay_ms: u64,
    /// Identity rotation detection mode.
    pub identity_check: IdentityCheckMode,
    /// Timer period for [`IdentityCheckMode::Interval`].
    pub identity_check_interval_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            server_url: "wss://kr-ss1.chat.naver.com/chat".to_string(),
            device_type: chzzk_core::protocol::DEFAULT_DEVICE_TYPE,
            recent_message_count: chzzk_core::protocol::DEFAULT_RECENT_MESSAGE_COUNT,
            reconnect_delay_ms: 1_000,
            identity_check: IdentityCheckMode::Ping,
            identity_check_interval_ms: 30_000,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
