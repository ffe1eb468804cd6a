//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ChzzkSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `CHZZK_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{
    API_TIMEOUT_MS, ChzzkSettings, IDENTITY_CHECK_INTERVAL_MS, IdentityCheckMode,
    RECENT_MESSAGE_COUNT, RECONNECT_DELAY_MS,
};

/// Resolve the path to the settings file (`~/.chzzk-chat/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".chzzk-chat").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ChzzkSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, a blank URL, or a number outside its accepted range,
/// returns an error naming the key.
pub fn load_settings_from_path(path: &Path) -> Result<ChzzkSettings> {
    let defaults = serde_json::to_value(ChzzkSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: ChzzkSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// - Integers must parse and fall inside the key's accepted range
/// - Booleans accept: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`
/// - Invalid values are logged and ignored (fall back to file/default)
pub fn apply_env_overrides(settings: &mut ChzzkSettings) {
    // ── API settings ────────────────────────────────────────────────
    if let Some(v) = read_env_string("CHZZK_API_BASE_URL") {
        settings.api.chzzk_base_url = v;
    }
    if let Some(v) = read_env_string("CHZZK_GAME_API_BASE_URL") {
        settings.api.game_base_url = v;
    }
    if let Some(v) = read_env_u64("CHZZK_API_TIMEOUT_MS", &API_TIMEOUT_MS) {
        settings.api.timeout_ms = v;
    }

    // ── Chat connection ─────────────────────────────────────────────
    if let Some(v) = read_env_string("CHZZK_CHAT_SERVER_URL") {
        settings.chat.server_url = v;
    }
    if let Some(v) = read_env_u32("CHZZK_RECENT_MESSAGE_COUNT", &RECENT_MESSAGE_COUNT) {
        settings.chat.recent_message_count = v;
    }
    if let Some(v) = read_env_u64("CHZZK_RECONNECT_DELAY_MS", &RECONNECT_DELAY_MS) {
        settings.chat.reconnect_delay_ms = v;
    }
    if let Some(v) = read_env_string("CHZZK_IDENTITY_CHECK") {
        match parse_identity_check(&v) {
            Some(mode) => settings.chat.identity_check = mode,
            None => {
                tracing::warn!(key = "CHZZK_IDENTITY_CHECK", value = %v, "invalid mode, ignoring");
            }
        }
    }
    if let Some(v) = read_env_u64("CHZZK_IDENTITY_CHECK_INTERVAL_MS", &IDENTITY_CHECK_INTERVAL_MS) {
        settings.chat.identity_check_interval_ms = v;
    }

    // ── Transcript ──────────────────────────────────────────────────
    if let Some(v) = read_env_string("CHZZK_TRANSCRIPT_PATH") {
        settings.transcript.path = v;
    }
    if let Some(v) = read_env_bool("CHZZK_TRANSCRIPT_ECHO") {
        settings.transcript.echo = v;
    }
    if let Some(v) = read_env_bool("CHZZK_TRANSCRIPT_APPEND") {
        settings.transcript.append = v;
    }
    if let Some(v) = read_env_string("CHZZK_LOCALE") {
        match v.parse() {
            Ok(locale) => settings.transcript.locale = locale,
            Err(e) => tracing::warn!(key = "CHZZK_LOCALE", error = %e, "ignoring"),
        }
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("CHZZK_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

fn validate(settings: &ChzzkSettings) -> Result<()> {
    let required = [
        ("api.chzzkBaseUrl", &settings.api.chzzk_base_url),
        ("api.gameBaseUrl", &settings.api.game_base_url),
        ("chat.serverUrl", &settings.chat.server_url),
    ];
    for (key, value) in required {
        if value.trim().is_empty() {
            return Err(SettingsError::Empty { key });
        }
    }

    check_range("api.timeoutMs", settings.api.timeout_ms, &API_TIMEOUT_MS)?;
    check_range(
        "chat.recentMessageCount",
        u64::from(settings.chat.recent_message_count),
        &widen(&RECENT_MESSAGE_COUNT),
    )?;
    check_range(
        "chat.reconnectDelayMs",
        settings.chat.reconnect_delay_ms,
        &RECONNECT_DELAY_MS,
    )?;
    check_range(
        "chat.identityCheckIntervalMs",
        settings.chat.identity_check_interval_ms,
        &IDENTITY_CHECK_INTERVAL_MS,
    )
}

fn check_range(key: &'static str, value: u64, range: &RangeInclusive<u64>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            key,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

fn widen(range: &RangeInclusive<u32>) -> RangeInclusive<u64> {
    u64::from(*range.start())..=u64::from(*range.end())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse an identity check mode (`ping` or `interval`, case-insensitive).
pub fn parse_identity_check(val: &str) -> Option<IdentityCheckMode> {
    match val.to_lowercase().as_str() {
        "ping" => Some(IdentityCheckMode::Ping),
        "interval" => Some(IdentityCheckMode::Interval),
        _ => None,
    }
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u32(name: &str, range: &RangeInclusive<u32>) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, *range.start(), *range.end());
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, range: &RangeInclusive<u64>) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, *range.start(), *range.end());
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
