//! Platform REST lookups.
//!
//! [`ChannelDirectory`] is the seam the session layer talks to; [`ChzzkApi`]
//! is the `reqwest` implementation against the live endpoints.

use std::time::Duration;

use async_trait::async_trait;
use chzzk_core::{ChannelId, StreamerId, UserIdHash};
use chzzk_settings::ApiSettings;
use reqwest::header::COOKIE;
use serde::de::DeserializeOwned;

use crate::credentials::Credentials;
use crate::errors::AuthError;
use crate::types::{
    AccessTokenContent, ApiResponse, ChannelInfo, ChatTokens, LiveStatus, UserStatus,
};

/// Identity, channel and token lookups needed to open a chat session.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Hashed id of the logged-in user.
    async fn user_identity(&self, credentials: &Credentials) -> Result<UserIdHash, AuthError>;

    /// Current chat channel id of the streamer.
    async fn channel_identity(
        &self,
        streamer: &StreamerId,
        credentials: &Credentials,
    ) -> Result<ChannelId, AuthError>;

    /// Display name of the streamer's channel.
    async fn channel_display_name(&self, streamer: &StreamerId) -> Result<String, AuthError>;

    /// Access token (and extra token) scoped to `channel`.
    async fn access_token(
        &self,
        channel: &ChannelId,
        credentials: &Credentials,
    ) -> Result<ChatTokens, AuthError>;
}

/// HTTP client for the platform's REST API.
#[derive(Clone, Debug)]
pub struct ChzzkApi {
    http: reqwest::Client,
    chzzk_base: String,
    game_base: String,
}

impl ChzzkApi {
    /// Build a client from API settings (base URLs, user agent, timeout).
    pub fn new(settings: &ApiSettings) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            chzzk_base: settings.chzzk_base_url.trim_end_matches('/').to_string(),
            game_base: settings.game_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_content<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, AuthError> {
        let resp = request.send().await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let text = resp.text().await.unwrap_or_default();
            return Err(AuthError::Api {
                status,
                message: text,
            });
        }

        let body = resp.text().await?;
        let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
        if envelope.code != 200 {
            return Err(AuthError::Api {
                status: u16::try_from(envelope.code).unwrap_or(0),
                message: envelope.message.unwrap_or_default(),
            });
        }
        Ok(envelope.content)
    }
}

#[async_trait]
impl ChannelDirectory for ChzzkApi {
    #[tracing::instrument(skip_all)]
    async fn user_identity(&self, credentials: &Credentials) -> Result<UserIdHash, AuthError> {
        let url = format!("{}/nng_main/v1/user/getUserStatus", self.game_base);
        let req = self
            .http
            .get(url)
            .header(COOKIE, credentials.cookie_header());
        let status: Option<UserStatus> = self.get_content(req).await?;
        status
            .and_then(|s| s.user_id_hash)
            .map(UserIdHash::from_string)
            .ok_or(AuthError::NotLoggedIn)
    }

    #[tracing::instrument(skip_all, fields(streamer = %streamer))]
    async fn channel_identity(
        &self,
        streamer: &StreamerId,
        credentials: &Credentials,
    ) -> Result<ChannelId, AuthError> {
        let url = format!(
            "{}/polling/v2/channels/{streamer}/live-status",
            self.chzzk_base
        );
        let req = self
            .http
            .get(url)
            .header(COOKIE, credentials.cookie_header());
        let status: Option<LiveStatus> = self.get_content(req).await?;
        status
            .and_then(|s| s.chat_channel_id)
            .map(ChannelId::from_string)
            .ok_or_else(|| AuthError::ChannelUnavailable(streamer.to_string()))
    }

    #[tracing::instrument(skip_all, fields(streamer = %streamer))]
    async fn channel_display_name(&self, streamer: &StreamerId) -> Result<String, AuthError> {
        let url = format!("{}/service/v1/channels/{streamer}", self.chzzk_base);
        let info: Option<ChannelInfo> = self.get_content(self.http.get(url)).await?;
        info.map(|i| i.channel_name)
            .ok_or_else(|| AuthError::ChannelUnavailable(streamer.to_string()))
    }

    #[tracing::instrument(skip_all, fields(channel = %channel))]
    async fn access_token(
        &self,
        channel: &ChannelId,
        credentials: &Credentials,
    ) -> Result<ChatTokens, AuthError> {
        let url = format!("{}/nng_main/v1/chats/access-token", self.game_base);
        let req = self
            .http
            .get(url)
            .query(&[("channelId", channel.as_str()), ("chatType", "STREAMING")])
            .header(COOKIE, credentials.cookie_header());
        let content: Option<AccessTokenContent> = self.get_content(req).await?;
        content.map(ChatTokens::from).ok_or(AuthError::Api {
            status: 200,
            message: "access token response had no content".to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
