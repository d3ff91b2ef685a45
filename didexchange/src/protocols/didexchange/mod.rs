use std::sync::Arc;

use crate::did::{DidCreator, DidResolver, DidStore};
use crate::storage::ConnectionStore;
use crate::transport::OutboundDispatcher;
use crate::wallet::BaseWallet;

pub mod service;
pub mod states;

/// Immutable bundle of collaborators the protocol runs against, built once
/// at service construction. Transitions borrow it; nothing here is global.
pub struct ExchangeContext {
    pub wallet: Arc<dyn BaseWallet>,
    pub store: ConnectionStore,
    pub did_creator: Arc<dyn DidCreator>,
    pub did_resolver: Arc<dyn DidResolver>,
    pub did_store: Arc<dyn DidStore>,
    pub dispatcher: Arc<dyn OutboundDispatcher>,
    /// Label presented to counterparts in invitations and requests.
    pub label: String,
    /// DID method asked of the creator when minting pairwise DIDs.
    pub did_method: String,
    /// Endpoint advertised in invitations this agent publishes.
    pub service_endpoint: String,
    pub routing_keys: Vec<String>,
}
