//! Session manager: channel identity, handshake, and re-establishment.
//!
//! A [`Session`] is one live connection. It is never patched: when the
//! transport fails or the channel identity rotates, the old session is
//! closed and a new one is built from fresh identity and token lookups.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chzzk_auth::{AuthError, ChannelDirectory, Credentials};
use chzzk_core::protocol::{self, Envelope};
use chzzk_core::{AccessToken, ChannelId, ProtocolError, SessionId, StreamerId, UserIdHash};
use chzzk_settings::ConnectionSettings;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::transport::{ChatTransport, TransportConnector, TransportError};

/// Why establishing a session failed.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Identity or token lookup failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Connecting, sending, or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The connect reply carried no session id.
    #[error("handshake failed: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Handshake parameters.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    /// `devType` sent with `connect`.
    pub device_type: u32,
    /// `recentMessageCount` sent with `request_recent_chat`.
    pub recent_message_count: u32,
    /// Pause between failed re-establish attempts.
    pub reconnect_delay: Duration,
}

impl SessionOptions {
    /// Options from the `chat` settings section.
    pub fn from_settings(settings: &ConnectionSettings) -> Self {
        Self {
            device_type: settings.device_type,
            recent_message_count: settings.recent_message_count,
            reconnect_delay: Duration::from_millis(settings.reconnect_delay_ms),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_settings(&ConnectionSettings::default())
    }
}

/// One established chat connection.
pub struct Session {
    /// Channel identity this session was opened for.
    pub channel_id: ChannelId,
    /// Server-assigned id, valid only for this transport.
    pub session_id: SessionId,
    /// Token used in the handshake.
    pub access_token: AccessToken,
    /// Extra token issued alongside the access token.
    pub extra_token: String,
    /// When the handshake completed.
    pub established_at: DateTime<Utc>,
    transport: Box<dyn ChatTransport>,
}

impl Session {
    /// The underlying transport.
    pub fn transport_mut(&mut self) -> &mut dyn ChatTransport {
        self.transport.as_mut()
    }

    /// Whether the transport is still usable.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Tear down the transport. The session id dies with it.
    pub async fn close(mut self) {
        self.transport.close().await;
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("channel_id", &self.channel_id)
            .field("session_id", &self.session_id)
            .field("established_at", &self.established_at)
            .field("connected", &self.transport.is_connected())
            .finish_non_exhaustive()
    }
}

/// Owns the streamer reference, credentials and collaborators needed to
/// build sessions.
pub struct SessionManager {
    streamer: StreamerId,
    credentials: Credentials,
    directory: Arc<dyn ChannelDirectory>,
    connector: Arc<dyn TransportConnector>,
    options: SessionOptions,
    user_id_hash: UserIdHash,
    channel_name: String,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("streamer", &self.streamer)
            .field("channel_name", &self.channel_name)
            .field("user_id_hash", &self.user_id_hash)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Look up the user hash and channel name once; both stay fixed for the
    /// life of the process.
    pub async fn new(
        streamer: StreamerId,
        credentials: Credentials,
        directory: Arc<dyn ChannelDirectory>,
        connector: Arc<dyn TransportConnector>,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let user_id_hash = directory.user_identity(&credentials).await?;
        let channel_name = directory.channel_display_name(&streamer).await?;
        info!(streamer = %streamer, channel_name = %channel_name, "resolved chat target");
        Ok(Self {
            streamer,
            credentials,
            directory,
            connector,
            options,
            user_id_hash,
            channel_name,
        })
    }

    /// Streamer this manager connects to.
    pub fn streamer(&self) -> &StreamerId {
        &self.streamer
    }

    /// Display name of the streamer's channel.
    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    /// Hashed id of the logged-in user.
    pub fn user_id_hash(&self) -> &UserIdHash {
        &self.user_id_hash
    }

    /// Fetch identity and token, connect, and run the two-step handshake.
    pub async fn establish(&self) -> Result<Session, SessionError> {
        let channel_id = self
            .directory
            .channel_identity(&self.streamer, &self.credentials)
            .await?;
        let tokens = self
            .directory
            .access_token(&channel_id, &self.credentials)
            .await?;

        let mut transport = self.connector.connect().await?;
        let envelope = Envelope::new(channel_id.clone());
        let session_id = match self
            .handshake(transport.as_mut(), &envelope, &tokens.access_token)
            .await
        {
            Ok(sid) => sid,
            Err(e) => {
                transport.close().await;
                return Err(e);
            }
        };

        if !transport.is_connected() {
            transport.close().await;
            return Err(TransportError::NotConnected.into());
        }

        info!(channel = %channel_id, sid = %session_id, "chat session established");
        Ok(Session {
            channel_id,
            session_id,
            access_token: tokens.access_token,
            extra_token: tokens.extra_token,
            established_at: Utc::now(),
            transport,
        })
    }

    async fn handshake(
        &self,
        transport: &mut dyn ChatTransport,
        envelope: &Envelope,
        token: &AccessToken,
    ) -> Result<SessionId, SessionError> {
        info!(channel = %envelope.channel_id(), ".");
        let connect = envelope.connect(&self.user_id_hash, token, self.options.device_type);
        transport.send_text(connect.to_string()).await?;
        let reply = transport.recv_text().await?;
        let session_id = protocol::parse_connect_reply(&reply)?;

        info!(sid = %session_id, "..");
        let recent =
            envelope.request_recent_chat(&session_id, self.options.recent_message_count);
        transport.send_text(recent.to_string()).await?;
        let _ = transport.recv_text().await?;

        info!("...");
        Ok(session_id)
    }

    /// Re-fetch the channel identity and compare it with `known`.
    pub async fn channel_identity_changed(&self, known: &ChannelId) -> Result<bool, AuthError> {
        let current = self
            .directory
            .channel_identity(&self.streamer, &self.credentials)
            .await?;
        if current != *known {
            info!(old = %known, new = %current, "chat channel identity changed");
        }
        Ok(current != *known)
    }

    /// Close `stale` and establish again until it works.
    ///
    /// Returns `None` only when `cancel` fires. Failed attempts are spaced
    /// by the fixed reconnect delay; there is no attempt limit.
    pub async fn reestablish(
        &self,
        stale: Session,
        cancel: &CancellationToken,
    ) -> Option<Session> {
        let old_sid = stale.session_id.clone();
        stale.close().await;

        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return None,
                r = self.establish() => r,
            };
            match result {
                Ok(session) => {
                    info!(
                        attempt,
                        old_sid = %old_sid,
                        sid = %session.session_id,
                        "chat session re-established"
                    );
                    return Some(session);
                }
                Err(e) => warn!(attempt, error = %e, "re-establish failed, retrying"),
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => return None,
                () = tokio::time::sleep(self.options.reconnect_delay) => {}
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
