//! Wire types exchanged between clients and the server
//!
//! Inbound events are the JSON bodies of `POST /event`, tagged by `"type"`.
//! Outbound events are queued per client and returned by `GET /poll`, tagged
//! by `"event"`.
//!
//! Both event enums are read through a flat frame struct rather than serde's
//! internally tagged representation, which buffers its input and cannot
//! hold a [`RawValue`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identity assigned to a client when it connects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Generate a fresh random identity
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for ClientId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a paired session, `"<initiator>#<responder>#<seq>"`
///
/// `seq` grows with every session a hub creates, so the same two clients
/// paired again get a different id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(initiator: ClientId, responder: ClientId, seq: u64) -> Self {
        Self(format!("{initiator}#{responder}#{seq}"))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handshake payload relayed between session members, kept as the exact
/// JSON text the sender wrote
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalPayload(Box<RawValue>);

impl SignalPayload {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        RawValue::from_string(json.to_owned()).map(Self)
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::value::to_raw_value(value).map(Self)
    }

    pub fn get(&self) -> &str {
        self.0.get()
    }
}

impl PartialEq for SignalPayload {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

/// Reads `data` even when it is `null`, which plain `Option` would swallow
fn present_payload<'de, D>(deserializer: D) -> Result<Option<SignalPayload>, D::Error>
where
    D: Deserializer<'de>,
{
    SignalPayload::deserialize(deserializer).map(Some)
}

fn missing(kind: &str, field: &str) -> String {
    format!("missing field `{field}` for `{kind}`")
}

/// Which side of a session starts the peer-connection negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Initiator,
    Responder,
}

/// Events sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", try_from = "ClientEventFrame")]
pub enum ClientEvent {
    SetName { name: String },
    FindPartner,
    /// Stop waiting for a partner
    CancelSearch,
    Signal {
        session_id: SessionId,
        data: SignalPayload,
    },
    Leave { session_id: SessionId },
    KeepAlive,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum ClientEventKind {
    SetName,
    FindPartner,
    CancelSearch,
    Signal,
    Leave,
    KeepAlive,
}

#[derive(Deserialize)]
struct ClientEventFrame {
    #[serde(rename = "type")]
    kind: ClientEventKind,
    name: Option<String>,
    session_id: Option<SessionId>,
    #[serde(default, deserialize_with = "present_payload")]
    data: Option<SignalPayload>,
}

impl TryFrom<ClientEventFrame> for ClientEvent {
    type Error = String;

    fn try_from(frame: ClientEventFrame) -> Result<Self, Self::Error> {
        Ok(match frame.kind {
            ClientEventKind::SetName => ClientEvent::SetName {
                name: frame.name.ok_or_else(|| missing("set_name", "name"))?,
            },
            ClientEventKind::FindPartner => ClientEvent::FindPartner,
            ClientEventKind::CancelSearch => ClientEvent::CancelSearch,
            ClientEventKind::Signal => ClientEvent::Signal {
                session_id: frame.session_id.ok_or_else(|| missing("signal", "session_id"))?,
                data: frame.data.ok_or_else(|| missing("signal", "data"))?,
            },
            ClientEventKind::Leave => ClientEvent::Leave {
                session_id: frame.session_id.ok_or_else(|| missing("leave", "session_id"))?,
            },
            ClientEventKind::KeepAlive => ClientEvent::KeepAlive,
        })
    }
}

impl FromStr for ClientEvent {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

/// Events delivered to a client through its mailbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", try_from = "ServerEventFrame")]
pub enum ServerEvent {
    OnlineUsers { count: usize },
    Waiting,
    PartnerFound {
        session_id: SessionId,
        role: Role,
        partner_name: Option<String>,
    },
    Signal { data: SignalPayload },
    PartnerLeft,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum ServerEventKind {
    OnlineUsers,
    Waiting,
    PartnerFound,
    Signal,
    PartnerLeft,
}

#[derive(Deserialize)]
struct ServerEventFrame {
    event: ServerEventKind,
    count: Option<usize>,
    session_id: Option<SessionId>,
    role: Option<Role>,
    partner_name: Option<String>,
    #[serde(default, deserialize_with = "present_payload")]
    data: Option<SignalPayload>,
}

impl TryFrom<ServerEventFrame> for ServerEvent {
    type Error = String;

    fn try_from(frame: ServerEventFrame) -> Result<Self, Self::Error> {
        Ok(match frame.event {
            ServerEventKind::OnlineUsers => ServerEvent::OnlineUsers {
                count: frame.count.ok_or_else(|| missing("online_users", "count"))?,
            },
            ServerEventKind::Waiting => ServerEvent::Waiting,
            ServerEventKind::PartnerFound => ServerEvent::PartnerFound {
                session_id: frame
                    .session_id
                    .ok_or_else(|| missing("partner_found", "session_id"))?,
                role: frame.role.ok_or_else(|| missing("partner_found", "role"))?,
                partner_name: frame.partner_name,
            },
            ServerEventKind::Signal => ServerEvent::Signal {
                data: frame.data.ok_or_else(|| missing("signal", "data"))?,
            },
            ServerEventKind::PartnerLeft => ServerEvent::PartnerLeft,
        })
    }
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Body of a poll response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    pub client_id: ClientId,
    pub events: Vec<ServerEvent>,
}
