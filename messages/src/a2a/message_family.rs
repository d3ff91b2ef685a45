#[derive(Debug, Clone, PartialEq)]
pub enum MessageFamilies {
    DidExchange,
    Notification,
    Signature,
    Unknown(String),
}

impl MessageFamilies {
    pub fn version(&self) -> &'static str {
        // every family this agent speaks is at 1.0
        "1.0"
    }
}

impl From<&str> for MessageFamilies {
    fn from(family: &str) -> Self {
        match family {
            "didexchange" => MessageFamilies::DidExchange,
            "notification" => MessageFamilies::Notification,
            "signature" => MessageFamilies::Signature,
            other => MessageFamilies::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for MessageFamilies {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MessageFamilies::DidExchange => write!(f, "didexchange"),
            MessageFamilies::Notification => write!(f, "notification"),
            MessageFamilies::Signature => write!(f, "signature"),
            MessageFamilies::Unknown(family) => write!(f, "{}", family),
        }
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_family_names_roundtrip() {
        for name in ["didexchange", "notification", "signature"] {
            assert_eq!(MessageFamilies::from(name).to_string(), name);
        }
        assert_eq!(
            MessageFamilies::from("trust_ping"),
            MessageFamilies::Unknown("trust_ping".to_string())
        );
    }
}
