//! REST response shapes.

use chzzk_core::AccessToken;
use serde::Deserialize;

/// Common response envelope: `{code, message, content}`.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    /// Envelope status code, 200 on success.
    pub code: i64,
    /// Human-readable status.
    #[serde(default)]
    pub message: Option<String>,
    /// Payload. Absent or `null` for some failures.
    #[serde(default = "Option::default")]
    pub content: Option<T>,
}

/// `getUserStatus` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    /// Hashed user id; `null` when the cookies are not logged in.
    #[serde(default)]
    pub user_id_hash: Option<String>,
}

/// `live-status` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatus {
    /// Current chat channel id; `null` when chat is unavailable.
    #[serde(default)]
    pub chat_channel_id: Option<String>,
}

/// `channels/{id}` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    /// Display name of the channel.
    pub channel_name: String,
}

/// `access-token` payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenContent {
    /// Chat access token.
    pub access_token: String,
    /// Secondary token the platform issues alongside the access token.
    #[serde(default)]
    pub extra_token: Option<String>,
}

/// Tokens scoped to one chat channel id.
#[derive(Clone, Debug)]
pub struct ChatTokens {
    /// Token sent in the connect message.
    pub access_token: AccessToken,
    /// Extra token; empty if the platform sent none.
    pub extra_token: String,
}

impl From<AccessTokenContent> for ChatTokens {
    fn from(c: AccessTokenContent) -> Self {
        Self {
            access_token: AccessToken::new(c.access_token),
            extra_token: c.extra_token.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_with_null_content() {
        let r: ApiResponse<LiveStatus> =
            serde_json::from_str(r#"{"code": 200, "message": null, "content": null}"#).unwrap();
        assert_eq!(r.code, 200);
        assert!(r.content.is_none());
    }

    #[test]
    fn tokens_default_extra_token() {
        let c: AccessTokenContent = serde_json::from_str(r#"{"accessToken": "t"}"#).unwrap();
        let tokens = ChatTokens::from(c);
        assert_eq!(tokens.access_token.expose(), "t");
        assert_eq!(tokens.extra_token, "");
    }
}
