use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// `~thread` decorator correlating a message with its conversation
/// (Aries RFC 0008).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct Thread {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pthid: Option<String>,
    #[serde(default)]
    pub sender_order: u32,
    #[serde(default)]
    pub received_orders: HashMap<String, u32>,
}

impl Thread {
    /// Decorator for a reply within the thread `thread_id`.
    pub fn for_thread(thread_id: String) -> Thread {
        Thread {
            thid: Some(thread_id),
            ..Default::default()
        }
    }

    /// Decorator for a message that opens its own thread but references a
    /// parent conversation, e.g. a request answering an invitation.
    pub fn child_of(parent_id: String) -> Thread {
        Thread {
            pthid: Some(parent_id),
            ..Default::default()
        }
    }

    pub fn is_reply_to(&self, id: &str) -> bool {
        self.thid.as_deref() == Some(id)
    }
}
