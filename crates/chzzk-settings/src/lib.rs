//! # chzzk-settings
//!
//! Layered configuration for the Chzzk chat client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`ChzzkSettings::default()`])
//! 2. **User file** `~/.chzzk-chat/settings.json`, deep-merged over defaults
//! 3. **Environment variables** `CHZZK_*` overrides (highest priority)
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path,
};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = ChzzkSettings::default();
        let path = settings_path();
        assert!(path.ends_with(".chzzk-chat/settings.json"));
    }

    #[test]
    fn deep_merge_re_exported() {
        let a = serde_json::json!({"x": 1});
        let b = serde_json::json!({"y": 2});
        let merged = deep_merge(a, b);
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }
}
