//! In-memory doubles for the transport, connector and REST directory.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chzzk_auth::{AuthError, ChannelDirectory, ChatTokens, Credentials};
use chzzk_core::{AccessToken, ChannelId, StreamerId, UserIdHash};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::transport::{ChatTransport, TransportConnector, TransportError};

/// Reply to `connect` carrying `sid`.
pub fn connect_reply(sid: &str) -> String {
    serde_json::json!({
        "ver": "2",
        "cmd": 10100,
        "svcid": "game",
        "tid": "1",
        "retCode": 0,
        "retMsg": "",
        "bdy": {"sid": sid, "uid": "user-hash"},
    })
    .to_string()
}

/// One transport event, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Journal {
    /// A frame handed to the reader.
    Recv(String),
    /// A frame sent by the client.
    Send(String),
}

enum Step {
    Frame(String),
    Fail,
}

enum WhenDrained {
    Close,
    Hold,
    Cancel(CancellationToken),
}

/// Transport that replays a fixed script of inbound frames.
///
/// When the script runs out it closes, stays silent, or fires a
/// cancellation token, depending on how it was built.
pub struct ScriptedTransport {
    steps: VecDeque<Step>,
    connected: bool,
    drop_connection_when_drained: bool,
    when_drained: WhenDrained,
    send_limit: Option<usize>,
    sent: Arc<Mutex<Vec<String>>>,
    journal: Arc<Mutex<Vec<Journal>>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// Empty script; reads fail with [`TransportError::Closed`].
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            connected: true,
            drop_connection_when_drained: false,
            when_drained: WhenDrained::Close,
            send_limit: None,
            sent: Arc::default(),
            journal: Arc::default(),
        }
    }

    /// Queue an inbound frame.
    #[must_use]
    pub fn with_frame(mut self, text: impl Into<String>) -> Self {
        self.steps.push_back(Step::Frame(text.into()));
        self
    }

    /// Queue a read failure.
    #[must_use]
    pub fn with_failure(mut self) -> Self {
        self.steps.push_back(Step::Fail);
        self
    }

    /// Stay connected and silent once the script is drained.
    #[must_use]
    pub fn hold_open(mut self) -> Self {
        self.when_drained = WhenDrained::Hold;
        self
    }

    /// Cancel `token` on the first read after the script is drained.
    #[must_use]
    pub fn then_cancel(mut self, token: &CancellationToken) -> Self {
        self.when_drained = WhenDrained::Cancel(token.clone());
        self
    }

    /// Report disconnected as soon as the last scripted frame is read.
    #[must_use]
    pub fn disconnect_after_script(mut self) -> Self {
        self.drop_connection_when_drained = true;
        self
    }

    /// Accept `count` sends, then fail every later send and drop the
    /// connection.
    #[must_use]
    pub fn fail_sends_after(mut self, count: usize) -> Self {
        self.send_limit = Some(count);
        self
    }

    /// Frames sent through this transport.
    pub fn sent(&self) -> Arc<Mutex<Vec<String>>> {
        self.sent.clone()
    }

    /// Sends and receives in order.
    pub fn journal(&self) -> Arc<Mutex<Vec<Journal>>> {
        self.journal.clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Closed);
        }
        if self.send_limit.is_some_and(|limit| self.sent.lock().len() >= limit) {
            self.connected = false;
            return Err(TransportError::Closed);
        }
        self.journal.lock().push(Journal::Send(text.clone()));
        self.sent.lock().push(text);
        Ok(())
    }

    async fn recv_text(&mut self) -> Result<String, TransportError> {
        match self.steps.pop_front() {
            Some(Step::Frame(text)) => {
                if self.steps.is_empty() && self.drop_connection_when_drained {
                    self.connected = false;
                }
                self.journal.lock().push(Journal::Recv(text.clone()));
                Ok(text)
            }
            Some(Step::Fail) => {
                self.connected = false;
                Err(TransportError::Closed)
            }
            None => match &self.when_drained {
                WhenDrained::Close => {
                    self.connected = false;
                    Err(TransportError::Closed)
                }
                WhenDrained::Hold => std::future::pending().await,
                WhenDrained::Cancel(token) => {
                    token.cancel();
                    std::future::pending().await
                }
            },
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn close(&mut self) {
        self.connected = false;
    }
}

/// Hands out scripted transports in order; fails once they run out.
#[derive(Default)]
pub struct ScriptedConnector {
    transports: Mutex<VecDeque<ScriptedTransport>>,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    /// Connector yielding `transports` one per connect.
    pub fn new(transports: impl IntoIterator<Item = ScriptedTransport>) -> Self {
        Self {
            transports: Mutex::new(transports.into_iter().collect()),
            connects: AtomicUsize::new(0),
        }
    }

    /// Number of connect calls so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportConnector for ScriptedConnector {
    async fn connect(&self) -> Result<Box<dyn ChatTransport>, TransportError> {
        let _ = self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.transports.lock().pop_front();
        match next {
            Some(t) => Ok(Box::new(t)),
            None => Err(TransportError::Closed),
        }
    }
}

/// Directory answering from a script of channel identities.
///
/// Each identity lookup consumes one step; the last step repeats forever.
/// A `None` step fails the lookup.
pub struct FakeDirectory {
    identities: Mutex<VecDeque<Option<String>>>,
    logged_in: bool,
    stall_after: Option<usize>,
    identity_calls: AtomicUsize,
}

impl FakeDirectory {
    /// Directory cycling through `identities`.
    pub fn new<S: Into<String>>(identities: impl IntoIterator<Item = S>) -> Self {
        Self::from_steps(identities.into_iter().map(|s| Some(s.into())))
    }

    /// Directory whose steps may fail (`None`).
    pub fn from_steps(steps: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            identities: Mutex::new(steps.into_iter().collect()),
            logged_in: true,
            stall_after: None,
            identity_calls: AtomicUsize::new(0),
        }
    }

    /// Report the cookies as logged out.
    #[must_use]
    pub fn logged_out(mut self) -> Self {
        self.logged_in = false;
        self
    }

    /// Answer the first `count` identity lookups; later ones never return.
    #[must_use]
    pub fn stall_after(mut self, count: usize) -> Self {
        self.stall_after = Some(count);
        self
    }

    /// Number of channel identity lookups so far.
    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelDirectory for FakeDirectory {
    async fn user_identity(&self, _credentials: &Credentials) -> Result<UserIdHash, AuthError> {
        if self.logged_in {
            Ok(UserIdHash::from("user-hash"))
        } else {
            Err(AuthError::NotLoggedIn)
        }
    }

    async fn channel_identity(
        &self,
        streamer: &StreamerId,
        _credentials: &Credentials,
    ) -> Result<ChannelId, AuthError> {
        let previous = self.identity_calls.fetch_add(1, Ordering::SeqCst);
        if self.stall_after.is_some_and(|limit| previous >= limit) {
            std::future::pending::<()>().await;
        }
        let step = {
            let mut steps = self.identities.lock();
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        };
        match step {
            Some(Some(id)) => Ok(ChannelId::from_string(id)),
            Some(None) => Err(AuthError::Api {
                status: 503,
                message: "scripted failure".into(),
            }),
            None => Err(AuthError::ChannelUnavailable(streamer.to_string())),
        }
    }

    async fn channel_display_name(&self, _streamer: &StreamerId) -> Result<String, AuthError> {
        Ok("Streamer One".into())
    }

    async fn access_token(
        &self,
        channel: &ChannelId,
        _credentials: &Credentials,
    ) -> Result<ChatTokens, AuthError> {
        Ok(ChatTokens {
            access_token: AccessToken::new(format!("token-{channel}")),
            extra_token: format!("extra-{channel}"),
        })
    }
}
