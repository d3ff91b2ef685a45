use messages::a2a::A2AMessage;
use serde::{Deserialize, Serialize};

/// Which side of a thread the local record represents. Conversations this
/// party opened (invitee) are indexed under `my`; conversations it responds
/// to (inviter) under `their`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    My,
    Their,
}

impl Namespace {
    /// Namespace an inbound message is correlated under.
    pub fn from_msg(msg: &A2AMessage) -> Option<Namespace> {
        match msg {
            A2AMessage::ConnectionInvitation(_) | A2AMessage::ConnectionResponse(_) => Some(Namespace::My),
            A2AMessage::ConnectionRequest(_) | A2AMessage::Ack(_) => Some(Namespace::Their),
            A2AMessage::Generic(_) => None,
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Namespace::My => write!(f, "my"),
            Namespace::Their => write!(f, "their"),
        }
    }
}

pub const RECORD_VERSION: u32 = 1;

fn record_version() -> u32 {
    RECORD_VERSION
}

/// Root entity of the protocol: one record per exchange conversation, keyed
/// by a connection id that stays stable for the record's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionRecord {
    pub connection_id: String,
    /// Name of the last committed state.
    pub state: String,
    pub thread_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_did: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub their_did: Option<String>,
    pub namespace: Namespace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation_id: Option<String>,
    /// Last-known destination for outbound messages to the counterpart.
    #[serde(default)]
    pub service_endpoint: String,
    #[serde(default)]
    pub recipient_keys: Vec<String>,
    #[serde(default)]
    pub routing_keys: Vec<String>,
    /// Id of the last inbound message committed on this record; replays of
    /// the same message are treated as no-ops.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_msg_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abandon_reason: Option<String>,
    #[serde(default = "record_version")]
    pub version: u32,
}

impl Default for ConnectionRecord {
    fn default() -> ConnectionRecord {
        ConnectionRecord {
            connection_id: String::new(),
            state: String::from("null"),
            thread_id: String::new(),
            parent_thread_id: None,
            my_did: None,
            their_did: None,
            namespace: Namespace::My,
            invitation_id: None,
            service_endpoint: String::new(),
            recipient_keys: Vec::new(),
            routing_keys: Vec::new(),
            last_msg_id: None,
            abandon_reason: None,
            version: RECORD_VERSION,
        }
    }
}
