use async_trait::async_trait;
use diddoc::aries::diddoc::AriesDidDoc;
use messages::a2a::A2AMessage;
use messages::didexchange::invitation::Invitation;
use serde::{Deserialize, Serialize};

use crate::errors::error::{ExchangeError, ExchangeErrorKind, ExchangeResult};

/// Where an outbound message should be delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Destination {
    pub service_endpoint: String,
    pub recipient_keys: Vec<String>,
    pub routing_keys: Vec<String>,
}

impl Destination {
    pub fn from_invitation(invitation: &Invitation) -> Destination {
        Destination {
            service_endpoint: invitation.service_endpoint.clone(),
            recipient_keys: invitation.recipient_keys.clone(),
            routing_keys: invitation.routing_keys.clone(),
        }
    }

    pub fn from_did_doc(did_doc: &AriesDidDoc) -> ExchangeResult<Destination> {
        let service = did_doc.resolved_service()?;
        if service.recipient_keys.is_empty() {
            return Err(ExchangeError::from_msg(
                ExchangeErrorKind::ServiceNotFound,
                format!("DID Document {} names no recipient keys", did_doc.id),
            ));
        }
        Ok(Destination {
            service_endpoint: service.service_endpoint,
            recipient_keys: service.recipient_keys,
            routing_keys: service.routing_keys,
        })
    }
}

/// Outbound half of the transport. Implementations pack and deliver the
/// message; failures surface as `DispatchFailed` and are retryable.
#[async_trait]
pub trait OutboundDispatcher: Send + Sync {
    async fn send(&self, payload: &A2AMessage, sender_verkey: &str, destination: &Destination) -> ExchangeResult<()>;
}
