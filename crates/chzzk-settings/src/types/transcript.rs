//! Transcript output settings.

use chzzk_core::Locale;
use serde::{Deserialize, Serialize};

/// Where and how chat records are written.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptSettings {
    /// Transcript file path.
    pub path: String,
    /// Append to an existing file instead of truncating it.
    pub append: bool,
    /// Also print every record to stdout.
    pub echo: bool,
    /// Label language for categories and the anonymous sender.
    pub locale: Locale,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            path: "./chat.txt".to_string(),
            append: true,
            echo: true,
            locale: Locale::Ko,
        }
    }
}
