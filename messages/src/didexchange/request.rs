use diddoc::aries::diddoc::AriesDidDoc;
use serde::{Deserialize, Serialize};

use crate::a2a::{A2AMessage, MessageId};
use crate::thread::Thread;

/// Exchange request carrying the invitee's freshly minted DID Document.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Request {
    #[serde(rename = "@id")]
    pub id: MessageId,
    #[serde(default)]
    pub label: String,
    pub connection: ConnectionData,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "~thread")]
    pub thread: Option<Thread>,
}

/// The DID and DID Document one party offers to the other.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct ConnectionData {
    #[serde(rename = "DID")]
    pub did: String,
    #[serde(rename = "DIDDoc")]
    pub did_doc: AriesDidDoc,
}

impl Request {
    pub fn new(label: String, did: String, did_doc: AriesDidDoc) -> Request {
        Request {
            id: MessageId::new(),
            label,
            connection: ConnectionData { did, did_doc },
            thread: None,
        }
    }

    /// Links the request back to the invitation that prompted it.
    pub fn in_reply_to(mut self, invitation_id: &str) -> Request {
        let mut thread = self.thread.take().unwrap_or_default();
        thread.pthid = Some(invitation_id.to_string());
        self.thread = Some(thread);
        self
    }

    pub fn in_thread(mut self, thread_id: &str) -> Request {
        let mut thread = self.thread.take().unwrap_or_default();
        thread.thid = Some(thread_id.to_string());
        self.thread = Some(thread);
        self
    }

    pub fn thread_id(&self) -> Option<String> {
        self.thread.as_ref().and_then(|thread| thread.thid.clone())
    }

    pub fn parent_thread_id(&self) -> Option<String> {
        self.thread.as_ref().and_then(|thread| thread.pthid.clone())
    }
}

impl From<Request> for A2AMessage {
    fn from(request: Request) -> A2AMessage {
        A2AMessage::ConnectionRequest(request)
    }
}

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils {
    use diddoc::aries::diddoc::test_utils::{_did, _did_doc_inline};

    use super::*;

    pub fn _request() -> Request {
        Request {
            id: MessageId(String::from("test-request")),
            label: String::from("bob-agent"),
            connection: ConnectionData {
                did: _did(),
                did_doc: _did_doc_inline(),
            },
            thread: None,
        }
    }
}
