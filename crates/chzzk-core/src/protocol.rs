//! Chat wire protocol.
//!
//! Every message on the chat socket is a JSON object. Outbound control
//! messages carry a shared envelope (`ver`, `svcid`, `cid`) merged with a
//! message-specific part (`cmd`, `tid`, `sid`, `bdy`). Inbound frames are
//! tagged by `cmd`, and the code decides the shape of `bdy`:
//!
//! | cmd | body |
//! |---|---|
//! | `ping` | none |
//! | `connected` | object with `sid` |
//! | `chat` / `donation` | array of event entries |
//! | anything else | ignored |
//!
//! Command codes are a contract with the platform and must match it exactly.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::errors::ProtocolError;
use crate::events::ChatCategory;
use crate::ids::{AccessToken, ChannelId, SessionId, UserIdHash};

/// Protocol version sent in every envelope.
pub const PROTOCOL_VERSION: &str = "2";
/// Service id sent in every envelope.
pub const SERVICE_ID: &str = "game";
/// Device type constant for the `connect` message.
pub const DEFAULT_DEVICE_TYPE: u32 = 2001;
/// History depth requested right after connecting.
pub const DEFAULT_RECENT_MESSAGE_COUNT: u32 = 50;
/// Transaction id of the `connect` message.
pub const CONNECT_TID: u32 = 1;
/// Transaction id of the `request_recent_chat` message.
pub const RECENT_CHAT_TID: u32 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Command registry
// ─────────────────────────────────────────────────────────────────────────────

/// Command codes understood by the chat server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatCmd {
    /// Server keepalive.
    Ping,
    /// Keepalive reply.
    Pong,
    /// Session handshake request.
    Connect,
    /// Session handshake reply.
    Connected,
    /// Outbound chat message.
    SendChat,
    /// History request.
    RequestRecentChat,
    /// History reply.
    RecentChat,
    /// Channel event (subscriptions, etc.).
    Event,
    /// Live chat messages.
    Chat,
    /// Live donation messages.
    Donation,
    /// User kicked.
    Kick,
    /// User blocked.
    Block,
    /// Message blinded by a moderator.
    Blind,
    /// Pinned notice changed.
    Notice,
    /// Penalty applied.
    Penalty,
    /// Code outside the known registry.
    Unknown(i64),
}

impl ChatCmd {
    /// Numeric wire code.
    pub const fn code(self) -> i64 {
        match self {
            Self::Ping => 0,
            Self::Pong => 10000,
            Self::Connect => 100,
            Self::Connected => 10100,
            Self::SendChat => 3101,
            Self::RequestRecentChat => 5101,
            Self::RecentChat => 15101,
            Self::Event => 93006,
            Self::Chat => 93101,
            Self::Donation => 93102,
            Self::Kick => 94005,
            Self::Block => 94006,
            Self::Blind => 94008,
            Self::Notice => 94010,
            Self::Penalty => 94015,
            Self::Unknown(code) => code,
        }
    }

    /// Map a wire code back to a command.
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Ping,
            10000 => Self::Pong,
            100 => Self::Connect,
            10100 => Self::Connected,
            3101 => Self::SendChat,
            5101 => Self::RequestRecentChat,
            15101 => Self::RecentChat,
            93006 => Self::Event,
            93101 => Self::Chat,
            93102 => Self::Donation,
            94005 => Self::Kick,
            94006 => Self::Block,
            94008 => Self::Blind,
            94010 => Self::Notice,
            94015 => Self::Penalty,
            other => Self::Unknown(other),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// Shared envelope for control messages addressed to one channel.
#[derive(Clone, Debug)]
pub struct Envelope {
    channel_id: ChannelId,
}

impl Envelope {
    /// Envelope for the given channel.
    pub fn new(channel_id: ChannelId) -> Self {
        Self { channel_id }
    }

    /// Channel this envelope addresses.
    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    fn wrap(&self, cmd: ChatCmd, tid: u32, sid: Option<&SessionId>, bdy: Value) -> Value {
        let mut msg = json!({
            "ver": PROTOCOL_VERSION,
            "svcid": SERVICE_ID,
            "cid": self.channel_id,
            "cmd": cmd.code(),
            "tid": tid,
            "bdy": bdy,
        });
        if let Some(sid) = sid {
            msg["sid"] = Value::String(sid.to_string());
        }
        msg
    }

    /// First handshake step: authenticate with `auth = SEND`.
    pub fn connect(&self, uid: &UserIdHash, token: &AccessToken, device_type: u32) -> Value {
        self.wrap(
            ChatCmd::Connect,
            CONNECT_TID,
            None,
            json!({
                "uid": uid,
                "devType": device_type,
                "accTkn": token.expose(),
                "auth": "SEND",
            }),
        )
    }

    /// Second handshake step: ask for the last `count` messages.
    pub fn request_recent_chat(&self, sid: &SessionId, count: u32) -> Value {
        self.wrap(
            ChatCmd::RequestRecentChat,
            RECENT_CHAT_TID,
            Some(sid),
            json!({ "recentMessageCount": count }),
        )
    }
}

/// Keepalive reply. Minimal envelope: no channel or session id.
pub fn pong() -> Value {
    json!({
        "ver": PROTOCOL_VERSION,
        "cmd": ChatCmd::Pong.code(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawFrame {
    cmd: i64,
    #[serde(default)]
    bdy: Value,
    #[serde(default, rename = "retCode")]
    ret_code: Option<i64>,
    #[serde(default, rename = "retMsg")]
    ret_msg: Option<String>,
}

/// One classified inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// Server keepalive; must be answered with [`pong`].
    Ping,
    /// Handshake reply carrying the session id.
    Connected {
        /// Session id assigned to this connection.
        session_id: SessionId,
    },
    /// Chat or donation entries, not yet validated individually.
    Events {
        /// Which kind of event the entries are.
        category: ChatCategory,
        /// Raw entries from `bdy`.
        entries: Vec<Value>,
    },
    /// A frame with no action attached.
    Other {
        /// Its command code.
        cmd: ChatCmd,
    },
}

impl Frame {
    /// Parse and classify a raw text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        let cmd = ChatCmd::from_code(raw.cmd);

        let category = match cmd {
            ChatCmd::Ping => return Ok(Self::Ping),
            ChatCmd::Connected => {
                return Ok(match session_id_from_body(&raw.bdy) {
                    Some(session_id) => Self::Connected { session_id },
                    None => Self::Other { cmd },
                });
            }
            ChatCmd::Chat => ChatCategory::Chat,
            ChatCmd::Donation => ChatCategory::Donation,
            _ => return Ok(Self::Other { cmd }),
        };

        match raw.bdy {
            Value::Array(entries) => Ok(Self::Events { category, entries }),
            _ => Err(ProtocolError::UnexpectedBody {
                cmd: raw.cmd,
                expected: "array of entries",
            }),
        }
    }
}

fn session_id_from_body(bdy: &Value) -> Option<SessionId> {
    bdy.get("sid")
        .and_then(Value::as_str)
        .map(SessionId::from)
}

/// Extract the session id from the reply to a `connect` message.
///
/// The reply's command code is not checked: whatever the server answers
/// first must carry `bdy.sid`. A non-zero `retCode` without a session id is
/// reported as [`ProtocolError::Rejected`].
pub fn parse_connect_reply(text: &str) -> Result<SessionId, ProtocolError> {
    let raw: RawFrame = serde_json::from_str(text)?;
    if let Some(sid) = session_id_from_body(&raw.bdy) {
        return Ok(sid);
    }
    match raw.ret_code {
        Some(code) if code != 0 => Err(ProtocolError::Rejected {
            code,
            message: raw.ret_msg.unwrap_or_default(),
        }),
        _ => Err(ProtocolError::MissingField("bdy.sid")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
