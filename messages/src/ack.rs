use serde::{Deserialize, Serialize};

use crate::a2a::{A2AMessage, MessageId};
use crate::thread::Thread;

/// Notification closing out a message thread (Aries RFC 0015).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ack {
    #[serde(rename = "@id")]
    pub id: MessageId,
    pub status: AckStatus,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum AckStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "PENDING")]
    Pending,
}

impl Ack {
    /// Positive acknowledgement of the thread `thread_id`.
    pub fn for_thread(thread_id: String) -> Ack {
        Ack {
            id: MessageId::new(),
            status: AckStatus::Ok,
            thread: Thread::for_thread(thread_id),
        }
    }

    pub fn with_status(mut self, status: AckStatus) -> Ack {
        self.status = status;
        self
    }
}

impl From<Ack> for A2AMessage {
    fn from(ack: Ack) -> A2AMessage {
        A2AMessage::Ack(ack)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_ack_defaults_to_ok() {
        let ack = Ack::for_thread("thread-7".to_string());
        assert_eq!(ack.status, AckStatus::Ok);
        assert!(ack.thread.is_reply_to("thread-7"));
    }

    #[test]
    fn test_status_wire_values_are_uppercase() {
        let json = serde_json::to_value(Ack::for_thread("thread-7".to_string()).with_status(AckStatus::Fail)).unwrap();
        assert_eq!(json["status"], "FAIL");
        assert_eq!(json["~thread"]["thid"], "thread-7");
    }
}
