#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use diddoc::aries::diddoc::AriesDidDoc;
use messages::a2a::A2AMessage;

use didexchange::did::{DidCreator, DidResolver, DidStore};
use didexchange::errors::error::prelude::*;
use didexchange::protocols::didexchange::service::ConnectionService;
use didexchange::protocols::didexchange::ExchangeContext;
use didexchange::storage::in_memory::InMemoryRepository;
use didexchange::storage::ConnectionStore;
use didexchange::transport::{Destination, OutboundDispatcher};
use didexchange::utils::uuid::uuid;
use didexchange::wallet::BaseWallet;

pub fn init_logging() {
    didexchange::utils::devsetup::init_test_logging();
}

/// Ed25519 wallet holding keys in memory; key custody never leaves it.
pub struct MockWallet {
    keys: Mutex<HashMap<String, SigningKey>>,
}

impl MockWallet {
    pub fn new() -> MockWallet {
        MockWallet {
            keys: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl BaseWallet for MockWallet {
    async fn create_key(&self) -> ExchangeResult<String> {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verkey = bs58::encode(signing_key.verifying_key().to_bytes()).into_string();
        self.keys
            .lock()
            .expect("unpoisoned mutex")
            .insert(verkey.clone(), signing_key);
        Ok(verkey)
    }

    async fn sign(&self, verkey: &str, msg: &[u8]) -> ExchangeResult<Vec<u8>> {
        let keys = self.keys.lock().expect("unpoisoned mutex");
        let signing_key = keys.get(verkey).ok_or(err_msg(
            ExchangeErrorKind::NotFound,
            format!("Unknown verkey: {}", verkey),
        ))?;
        Ok(signing_key.sign(msg).to_bytes().to_vec())
    }

    async fn verify(&self, key: &[u8], msg: &[u8], signature: &[u8]) -> ExchangeResult<bool> {
        let key: [u8; 32] = match key.try_into() {
            Ok(key) => key,
            Err(_) => return Ok(false),
        };
        let verifying_key = match VerifyingKey::from_bytes(&key) {
            Ok(verifying_key) => verifying_key,
            Err(_) => return Ok(false),
        };
        let signature = match Signature::from_slice(signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };
        Ok(verifying_key.verify(msg, &signature).is_ok())
    }
}

/// DID Document directory shared by the store and resolver traits.
pub struct InMemoryDidStore {
    docs: RwLock<HashMap<String, AriesDidDoc>>,
}

impl InMemoryDidStore {
    pub fn new() -> InMemoryDidStore {
        InMemoryDidStore {
            docs: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl DidStore for InMemoryDidStore {
    async fn store(&self, doc: &AriesDidDoc) -> ExchangeResult<()> {
        self.docs
            .write()
            .expect("unpoisoned lock")
            .insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn get(&self, did: &str) -> ExchangeResult<AriesDidDoc> {
        self.docs
            .read()
            .expect("unpoisoned lock")
            .get(did)
            .cloned()
            .ok_or(err_msg(
                ExchangeErrorKind::NotFound,
                format!("No DID Document stored for {}", did),
            ))
    }
}

#[async_trait]
impl DidResolver for InMemoryDidStore {
    async fn resolve(&self, did: &str) -> ExchangeResult<AriesDidDoc> {
        self.docs
            .read()
            .expect("unpoisoned lock")
            .get(did)
            .cloned()
            .ok_or(err_msg(
                ExchangeErrorKind::DidResolveFailed,
                format!("Cannot resolve {}", did),
            ))
    }
}

/// Mints `did:peer` documents with one fresh Ed25519 key and the agent's
/// endpoint.
pub struct MockDidCreator {
    wallet: Arc<dyn BaseWallet>,
    service_endpoint: String,
}

impl MockDidCreator {
    pub fn new(wallet: Arc<dyn BaseWallet>, service_endpoint: &str) -> MockDidCreator {
        MockDidCreator {
            wallet,
            service_endpoint: service_endpoint.to_string(),
        }
    }
}

#[async_trait]
impl DidCreator for MockDidCreator {
    async fn create(&self, method: &str) -> ExchangeResult<AriesDidDoc> {
        let verkey = self.wallet.create_key().await?;

        let mut did_doc = AriesDidDoc::new(format!("did:{}:{}", method, &uuid()[..8]));
        did_doc.set_endpoint(self.service_endpoint.clone());
        did_doc.add_recipient_key(verkey);
        Ok(did_doc)
    }
}

/// Records outbound messages instead of delivering them; tests pump the
/// outbox into the counterpart service.
pub struct MockDispatcher {
    outbox: Mutex<VecDeque<(A2AMessage, Destination)>>,
}

impl MockDispatcher {
    pub fn new() -> MockDispatcher {
        MockDispatcher {
            outbox: Mutex::new(VecDeque::new()),
        }
    }

    pub fn pop(&self) -> Option<(A2AMessage, Destination)> {
        self.outbox.lock().expect("unpoisoned mutex").pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.lock().expect("unpoisoned mutex").is_empty()
    }
}

#[async_trait]
impl OutboundDispatcher for MockDispatcher {
    async fn send(&self, payload: &A2AMessage, _sender_verkey: &str, destination: &Destination) -> ExchangeResult<()> {
        self.outbox
            .lock()
            .expect("unpoisoned mutex")
            .push_back((payload.clone(), destination.clone()));
        Ok(())
    }
}

/// A dispatcher that refuses every send; exercises the transient error path.
pub struct FailingDispatcher;

#[async_trait]
impl OutboundDispatcher for FailingDispatcher {
    async fn send(&self, _payload: &A2AMessage, _sender_verkey: &str, _destination: &Destination) -> ExchangeResult<()> {
        Err(err_msg(ExchangeErrorKind::DispatchFailed, "Transport is down"))
    }
}

pub struct Agent {
    pub service: Arc<ConnectionService>,
    pub dispatcher: Arc<MockDispatcher>,
    pub did_store: Arc<InMemoryDidStore>,
}

pub fn exchange_context(
    label: &str,
    service_endpoint: &str,
    dispatcher: Arc<dyn OutboundDispatcher>,
    did_store: Arc<InMemoryDidStore>,
    resolver: Arc<InMemoryDidStore>,
) -> ExchangeContext {
    let wallet: Arc<dyn BaseWallet> = Arc::new(MockWallet::new());
    ExchangeContext {
        wallet: wallet.clone(),
        store: ConnectionStore::new(Arc::new(InMemoryRepository::new())),
        did_creator: Arc::new(MockDidCreator::new(wallet, service_endpoint)),
        did_resolver: resolver,
        did_store,
        dispatcher,
        label: label.to_string(),
        did_method: "peer".to_string(),
        service_endpoint: service_endpoint.to_string(),
        routing_keys: vec![],
    }
}

pub fn agent(label: &str, service_endpoint: &str) -> Agent {
    let did_store = Arc::new(InMemoryDidStore::new());
    let dispatcher = Arc::new(MockDispatcher::new());
    let ctx = exchange_context(
        label,
        service_endpoint,
        dispatcher.clone(),
        did_store.clone(),
        did_store.clone(),
    );
    Agent {
        service: Arc::new(ConnectionService::new(ctx)),
        dispatcher,
        did_store,
    }
}

pub fn service_with_dispatcher(
    label: &str,
    service_endpoint: &str,
    dispatcher: Arc<dyn OutboundDispatcher>,
) -> Arc<ConnectionService> {
    let did_store = Arc::new(InMemoryDidStore::new());
    let ctx = exchange_context(label, service_endpoint, dispatcher, did_store.clone(), did_store);
    Arc::new(ConnectionService::new(ctx))
}

/// Delivers the next queued outbound message to the receiving service.
pub async fn deliver_one(from: &Agent, to: &Agent) -> ExchangeResult<String> {
    let (payload, _destination) = from.dispatcher.pop().expect("a message waiting in the outbox");
    to.service.handle_inbound(payload).await
}

pub fn drain_state_names(receiver: &std::sync::mpsc::Receiver<didexchange::protocols::didexchange::service::StateEvent>) -> Vec<String> {
    receiver.try_iter().map(|event| event.state).collect()
}
