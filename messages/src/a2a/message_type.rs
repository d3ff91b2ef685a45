use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::a2a::message_family::MessageFamilies;

pub const MESSAGE_TYPE_PREFIX: &str = "https://didcomm.org";

/// Fully qualified `@type` of a DIDComm message:
/// `<prefix>/<family>/<version>/<name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageType {
    pub prefix: String,
    pub family: MessageFamilies,
    pub version: String,
    pub msg_type: String,
}

impl MessageType {
    pub fn build(family: MessageFamilies, name: &str) -> MessageType {
        MessageType {
            prefix: MESSAGE_TYPE_PREFIX.to_string(),
            version: family.version().to_string(),
            family,
            msg_type: name.to_string(),
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(uri: &str) -> Result<MessageType, String> {
        // the last three segments are family, version and name; everything
        // before them is the prefix
        let mut segments = uri.rsplitn(4, '/');
        let name = segments.next().filter(|segment| !segment.is_empty());
        let version = segments.next().filter(|segment| !segment.is_empty());
        let family = segments.next().filter(|segment| !segment.is_empty());
        let prefix = segments.next().filter(|segment| !segment.is_empty());

        match (prefix, family, version, name) {
            (Some(prefix), Some(family), Some(version), Some(name)) => Ok(MessageType {
                prefix: prefix.to_string(),
                family: MessageFamilies::from(family),
                version: version.to_string(),
                msg_type: name.to_string(),
            }),
            _ => Err(format!("Cannot parse @type uri: {:?}", uri)),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.prefix, self.family, self.version, self.msg_type)
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer).map_err(de::Error::custom)?;
        value
            .as_str()
            .ok_or(de::Error::custom("@type must be a string"))
            .and_then(|uri| uri.parse().map_err(de::Error::custom))
    }
}

impl Serialize for MessageType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
