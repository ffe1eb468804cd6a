//! Branded ID newtypes for type safety.
//!
//! Every identifier the platform hands out is an opaque string, and several
//! of them travel together in the same message (channel id, session id, user
//! hash). Each gets a distinct newtype wrapper around `String` so they cannot
//! be swapped by accident.
//!
//! None of these are generated locally: they are always assigned by the
//! platform's REST API or chat server.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Streamer channel reference (the hash in `chzzk.naver.com/live/<id>`).
    StreamerId
}

branded_id! {
    /// Chat room identity for the streamer's current broadcast.
    ///
    /// Rotates when a broadcast starts or stops.
    ChannelId
}

branded_id! {
    /// Server-assigned id for one live chat connection.
    ///
    /// Valid only for the transport that produced it.
    SessionId
}

branded_id! {
    /// Hashed id of the logged-in user, sent as `uid` in the connect message.
    UserIdHash
}

/// Chat access token scoped to a single channel id.
///
/// `Debug` is redacted so tokens never land in the operational log.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Return the raw token for the wire.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_and_display() {
        let id = ChannelId::from("N1abcd");
        assert_eq!(id.as_str(), "N1abcd");
        assert_eq!(id.to_string(), "N1abcd");
    }

    #[test]
    fn deref_to_str() {
        let sid = SessionId::from("sid-1");
        assert!(sid.starts_with("sid"));
    }

    #[test]
    fn serde_transparent() {
        let id = UserIdHash::from("hash");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"hash\"");
        let back: UserIdHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn distinct_ids_compare_by_value() {
        assert_eq!(ChannelId::from("a"), ChannelId::from_string("a".into()));
        assert_ne!(ChannelId::from("a"), ChannelId::from("b"));
    }

    #[test]
    fn into_inner_roundtrip() {
        let s: String = StreamerId::from("streamer").into();
        assert_eq!(s, "streamer");
        assert_eq!(StreamerId::from("x").into_inner(), "x");
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let tok = AccessToken::new("secret-token");
        let dbg = format!("{tok:?}");
        assert!(!dbg.contains("secret"));
        assert_eq!(tok.expose(), "secret-token");
    }
}
