use async_trait::async_trait;
use diddoc::aries::diddoc::AriesDidDoc;

use crate::errors::error::ExchangeResult;

/// Mints a fresh DID and DID Document for the given method. The document
/// carries the new DID as its `id`, at least one Ed25519 verification key,
/// and the local agent's service endpoint.
#[async_trait]
pub trait DidCreator: Send + Sync {
    async fn create(&self, method: &str) -> ExchangeResult<AriesDidDoc>;
}

#[async_trait]
pub trait DidResolver: Send + Sync {
    async fn resolve(&self, did: &str) -> ExchangeResult<AriesDidDoc>;
}

/// Persistence for accepted counterpart documents and our own minted ones.
#[async_trait]
pub trait DidStore: Send + Sync {
    async fn store(&self, doc: &AriesDidDoc) -> ExchangeResult<()>;

    async fn get(&self, did: &str) -> ExchangeResult<AriesDidDoc>;
}
