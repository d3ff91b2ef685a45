use async_trait::async_trait;

use crate::errors::error::ExchangeResult;

/// Key custody boundary. The protocol engine only ever names keys by their
/// base58 verkey; private key material stays behind this trait.
#[async_trait]
pub trait BaseWallet: Send + Sync {
    /// Generates a fresh Ed25519 keypair and returns its base58 verkey.
    async fn create_key(&self) -> ExchangeResult<String>;

    async fn sign(&self, verkey: &str, msg: &[u8]) -> ExchangeResult<Vec<u8>>;

    /// Verifies `signature` over `msg` under a raw Ed25519 public key.
    async fn verify(&self, key: &[u8], msg: &[u8], signature: &[u8]) -> ExchangeResult<bool>;
}
