use serde::{Deserialize, Serialize};

use crate::a2a::message_family::MessageFamilies;
use crate::a2a::message_type::MessageType;
use crate::a2a::{A2AMessage, MessageId};
use crate::thread::Thread;

pub const SIGNATURE_TYPE_NAME: &str = "ed25519Sha512_single";

/// Exchange response. The inviter's connection data travels only inside the
/// attached signature, never in the clear, so the invitee can authenticate
/// it against the key the signature itself asserts.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SignedResponse {
    #[serde(rename = "@id")]
    pub id: MessageId,
    #[serde(rename = "~thread")]
    pub thread: Thread,
    #[serde(rename = "connection~sig")]
    pub connection_sig: ConnectionSignature,
}

/// Detached signature over a timestamped connection payload.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConnectionSignature {
    #[serde(rename = "@type")]
    pub msg_type: MessageType,
    #[serde(default)]
    pub sig_data: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub sign_ver_key: String,
}

impl SignedResponse {
    pub fn new(thread_id: String, connection_sig: ConnectionSignature) -> SignedResponse {
        SignedResponse {
            id: MessageId::new(),
            thread: Thread::for_thread(thread_id),
            connection_sig,
        }
    }
}

impl ConnectionSignature {
    pub fn new(sig_data: String, signature: String, sign_ver_key: String) -> ConnectionSignature {
        ConnectionSignature {
            msg_type: MessageType::build(MessageFamilies::Signature, SIGNATURE_TYPE_NAME),
            sig_data,
            signature,
            sign_ver_key,
        }
    }
}

impl From<SignedResponse> for A2AMessage {
    fn from(response: SignedResponse) -> A2AMessage {
        A2AMessage::ConnectionResponse(response)
    }
}
