use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::ack::Ack;
use crate::didexchange::invitation::Invitation;
use crate::didexchange::request::Request;
use crate::didexchange::response::SignedResponse;

use self::message_family::MessageFamilies;
use self::message_type::MessageType;

pub mod message_family;
pub mod message_type;

/// Typed envelope over every protocol message this agent understands,
/// dispatched on the `@type` field. Anything else is carried as `Generic`
/// so transports can log or reject it without losing the payload.
#[derive(Debug, PartialEq, Clone)]
pub enum A2AMessage {
    ConnectionInvitation(Invitation),
    ConnectionRequest(Request),
    ConnectionResponse(SignedResponse),
    Ack(Ack),
    Generic(Value),
}

impl A2AMessage {
    const CONNECTION_INVITATION: &'static str = "invitation";
    const CONNECTION_REQUEST: &'static str = "request";
    const CONNECTION_RESPONSE: &'static str = "response";
    const ACK: &'static str = "ack";

    pub fn id(&self) -> String {
        match self {
            Self::ConnectionInvitation(invitation) => invitation.id.0.clone(),
            Self::ConnectionRequest(request) => request.id.0.clone(),
            Self::ConnectionResponse(response) => response.id.0.clone(),
            Self::Ack(ack) => ack.id.0.clone(),
            Self::Generic(value) => value["@id"].as_str().unwrap_or_default().to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ConnectionInvitation(_) => Self::CONNECTION_INVITATION,
            Self::ConnectionRequest(_) => Self::CONNECTION_REQUEST,
            Self::ConnectionResponse(_) => Self::CONNECTION_RESPONSE,
            Self::Ack(_) => Self::ACK,
            Self::Generic(_) => "generic",
        }
    }

    pub fn thread_id(&self) -> Option<String> {
        match self {
            Self::ConnectionInvitation(_) => None,
            Self::ConnectionRequest(request) => request.thread_id(),
            Self::ConnectionResponse(response) => response.thread.thid.clone(),
            Self::Ack(ack) => ack.thread.thid.clone(),
            Self::Generic(_) => None,
        }
    }

    pub fn parent_thread_id(&self) -> Option<String> {
        match self {
            Self::ConnectionRequest(request) => request.parent_thread_id(),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for A2AMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer).map_err(de::Error::custom)?;
        trace!("Deserializing A2AMessage with @type {:?}", value["@type"]);

        let message_type: MessageType = match serde_json::from_value(value["@type"].clone()) {
            Ok(message_type) => message_type,
            Err(_) => return Ok(A2AMessage::Generic(value)),
        };

        match (&message_type.family, message_type.msg_type.as_str()) {
            (MessageFamilies::DidExchange, A2AMessage::CONNECTION_INVITATION) => Invitation::deserialize(value)
                .map(A2AMessage::ConnectionInvitation)
                .map_err(de::Error::custom),
            (MessageFamilies::DidExchange, A2AMessage::CONNECTION_REQUEST) => Request::deserialize(value)
                .map(A2AMessage::ConnectionRequest)
                .map_err(de::Error::custom),
            (MessageFamilies::DidExchange, A2AMessage::CONNECTION_RESPONSE) => SignedResponse::deserialize(value)
                .map(A2AMessage::ConnectionResponse)
                .map_err(de::Error::custom),
            (MessageFamilies::Notification, A2AMessage::ACK) => {
                Ack::deserialize(value).map(A2AMessage::Ack).map_err(de::Error::custom)
            }
            _ => {
                warn!("Unexpected @type {}, passing the message through as generic", message_type);
                Ok(A2AMessage::Generic(value))
            }
        }
    }
}

fn tag_with_type<T>(msg: &T, family: MessageFamilies, name: &str) -> Result<Value, serde_json::Error>
where
    T: Serialize,
{
    let mut value = serde_json::to_value(msg)?;
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "@type".to_string(),
            Value::String(MessageType::build(family, name).to_string()),
        );
    }
    Ok(value)
}

impl Serialize for A2AMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = match self {
            A2AMessage::ConnectionInvitation(msg) => {
                tag_with_type(msg, MessageFamilies::DidExchange, A2AMessage::CONNECTION_INVITATION)
            }
            A2AMessage::ConnectionRequest(msg) => {
                tag_with_type(msg, MessageFamilies::DidExchange, A2AMessage::CONNECTION_REQUEST)
            }
            A2AMessage::ConnectionResponse(msg) => {
                tag_with_type(msg, MessageFamilies::DidExchange, A2AMessage::CONNECTION_RESPONSE)
            }
            A2AMessage::Ack(msg) => tag_with_type(msg, MessageFamilies::Notification, A2AMessage::ACK),
            A2AMessage::Generic(msg) => Ok(msg.clone()),
        }
        .map_err(ser::Error::custom)?;

        value.serialize(serializer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new() -> MessageId {
        MessageId(crate::utils::uuid::uuid())
    }
}

impl Default for MessageId {
    fn default() -> MessageId {
        MessageId::new()
    }
}
