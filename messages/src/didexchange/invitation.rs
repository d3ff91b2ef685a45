use serde::{Deserialize, Serialize};

use crate::a2a::{A2AMessage, MessageId};

/// Out-of-band invitation. Either recipient keys plus an endpoint are
/// inlined, or a public DID is named for the invitee to resolve instead.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Invitation {
    #[serde(rename = "@id")]
    pub id: MessageId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    #[serde(rename = "recipientKeys")]
    pub recipient_keys: Vec<String>,
    #[serde(default)]
    #[serde(rename = "routingKeys")]
    pub routing_keys: Vec<String>,
    #[serde(default)]
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
    #[serde(default)]
    #[serde(skip_serializing_if = "String::is_empty")]
    pub did: String,
}

impl Invitation {
    pub fn new(
        label: String,
        recipient_keys: Vec<String>,
        service_endpoint: String,
        routing_keys: Vec<String>,
    ) -> Invitation {
        Invitation {
            id: MessageId::new(),
            label,
            recipient_keys,
            routing_keys,
            service_endpoint,
            did: String::new(),
        }
    }

    pub fn from_public_did(label: String, did: String) -> Invitation {
        Invitation {
            id: MessageId::new(),
            label,
            recipient_keys: Vec::new(),
            routing_keys: Vec::new(),
            service_endpoint: String::new(),
            did,
        }
    }
}

impl From<Invitation> for A2AMessage {
    fn from(invitation: Invitation) -> A2AMessage {
        A2AMessage::ConnectionInvitation(invitation)
    }
}

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils {
    use diddoc::aries::diddoc::test_utils::{_endpoint, _recipient_keys, _routing_keys};

    use super::*;

    pub fn _label() -> String {
        String::from("alice-agent")
    }

    pub fn _invitation() -> Invitation {
        Invitation {
            id: MessageId(String::from("test-invitation")),
            label: _label(),
            recipient_keys: _recipient_keys(),
            routing_keys: _routing_keys(),
            service_endpoint: _endpoint(),
            did: String::new(),
        }
    }
}
