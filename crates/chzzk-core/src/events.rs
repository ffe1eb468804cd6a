//! Chat and donation entries, and the transcript line built from them.
//!
//! A `chat` or `donation` frame carries an array of entries. Each entry is
//! validated on its own: a bad profile blob or a missing message drops that
//! entry and nothing else.
//!
//! ```json
//! {
//!   "uid": "a1b2c3",
//!   "profile": "{\"nickname\":\"Alice\",\"badge\":null}",
//!   "msg": "hello",
//!   "msgTime": 1700000000000
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProtocolError;

/// Sender id the platform uses for anonymous donations.
pub const ANONYMOUS_SENDER: &str = "anonymous";

/// Timestamp layout of the absolute time in a transcript line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─────────────────────────────────────────────────────────────────────────────
// Category and labels
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of event an entry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatCategory {
    /// Regular chat message.
    Chat,
    /// Donation message.
    Donation,
}

impl fmt::Display for ChatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Chat => "chat",
            Self::Donation => "donation",
        })
    }
}

/// Language of the transcript labels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Korean, the platform's own wording.
    #[default]
    Ko,
    /// English.
    En,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ko" => Ok(Self::Ko),
            "en" => Ok(Self::En),
            other => Err(format!("unknown locale: {other}")),
        }
    }
}

/// Fixed strings written into transcript lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Labels {
    /// Label for [`ChatCategory::Chat`].
    pub chat: &'static str,
    /// Label for [`ChatCategory::Donation`].
    pub donation: &'static str,
    /// Nickname shown for anonymous donors.
    pub anonymous: &'static str,
}

impl Labels {
    /// Labels for a locale.
    pub const fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::Ko => Self {
                chat: "채팅",
                donation: "후원",
                anonymous: "익명의 후원자",
            },
            Locale::En => Self {
                chat: "chat",
                donation: "donation",
                anonymous: "anonymous donor",
            },
        }
    }

    /// Label for a category.
    pub const fn category(&self, category: ChatCategory) -> &'static str {
        match category {
            ChatCategory::Chat => self.chat,
            ChatCategory::Donation => self.donation,
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self::for_locale(Locale::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event entry
// ─────────────────────────────────────────────────────────────────────────────

/// Who sent an entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sender {
    /// Anonymous donor; no profile is consulted.
    Anonymous,
    /// Logged-in user with a nickname from the profile blob.
    User {
        /// Platform user id.
        uid: String,
        /// Display nickname.
        nickname: String,
    },
}

#[derive(Deserialize)]
struct Profile {
    nickname: String,
}

/// One validated chat or donation item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventEntry {
    /// Sender identity.
    pub sender: Sender,
    /// Message text.
    pub message: String,
    /// When the message was sent.
    pub sent_at: DateTime<Utc>,
}

impl EventEntry {
    /// Validate one raw entry from a frame body.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let uid = value
            .get("uid")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField("uid"))?;

        let sender = if uid == ANONYMOUS_SENDER {
            Sender::Anonymous
        } else {
            Sender::User {
                uid: uid.to_owned(),
                nickname: parse_nickname(value.get("profile"))?,
            }
        };

        let message = value
            .get("msg")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField("msg"))?
            .to_owned();

        let millis = value
            .get("msgTime")
            .and_then(|t| t.as_i64().or_else(|| t.as_f64().map(|f| f as i64)))
            .ok_or(ProtocolError::MissingField("msgTime"))?;
        let sent_at = DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or(ProtocolError::InvalidTimestamp(millis))?;

        Ok(Self {
            sender,
            message,
            sent_at,
        })
    }

    /// Nickname to print, resolving anonymous donors through `labels`.
    pub fn nickname<'a>(&'a self, labels: &Labels) -> &'a str {
        match &self.sender {
            Sender::Anonymous => labels.anonymous,
            Sender::User { nickname, .. } => nickname,
        }
    }
}

fn parse_nickname(profile: Option<&Value>) -> Result<String, ProtocolError> {
    let blob = profile
        .and_then(Value::as_str)
        .ok_or_else(|| ProtocolError::InvalidProfile("profile is not a string".into()))?;
    let profile: Profile =
        serde_json::from_str(blob).map_err(|e| ProtocolError::InvalidProfile(e.to_string()))?;
    Ok(profile.nickname)
}

// ─────────────────────────────────────────────────────────────────────────────
// Log record
// ─────────────────────────────────────────────────────────────────────────────

/// One transcript line, immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Absolute send time.
    pub sent_at: DateTime<Utc>,
    /// Time since the session start, whole seconds.
    pub elapsed: TimeDelta,
    /// Event kind.
    pub category: ChatCategory,
    /// Resolved nickname.
    pub nickname: String,
    /// Message text.
    pub message: String,
}

impl LogRecord {
    /// Build a record from a validated entry.
    pub fn new(
        entry: &EventEntry,
        category: ChatCategory,
        start_time: DateTime<Utc>,
        labels: &Labels,
    ) -> Self {
        let elapsed = TimeDelta::seconds((entry.sent_at - start_time).num_seconds());
        Self {
            sent_at: entry.sent_at,
            elapsed,
            category,
            nickname: entry.nickname(labels).to_owned(),
            message: entry.message.clone(),
        }
    }

    /// `[<abs time> (+<elapsed>)][<category>] <nickname> : <message>`
    pub fn render<Tz>(&self, labels: &Labels, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        format!(
            "[{} (+{})][{}] {} : {}",
            self.sent_at.with_timezone(tz).format(TIMESTAMP_FORMAT),
            format_elapsed(self.elapsed),
            labels.category(self.category),
            self.nickname,
            self.message,
        )
    }
}

/// Format a duration as `H:MM:SS`, truncated to whole seconds.
///
/// Durations of a day or more get a `N day(s), ` prefix; negative durations
/// get a leading `-`.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let total = elapsed.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();

    let days = total / 86_400;
    let rem = total % 86_400;
    let (hours, minutes, seconds) = (rem / 3600, rem % 3600 / 60, rem % 60);

    match days {
        0 => format!("{sign}{hours}:{minutes:02}:{seconds:02}"),
        1 => format!("{sign}1 day, {hours}:{minutes:02}:{seconds:02}"),
        n => format!("{sign}{n} days, {hours}:{minutes:02}:{seconds:02}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
