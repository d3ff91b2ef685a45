use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::error::{ExchangeError, ExchangeErrorKind, ExchangeResult};

pub mod in_memory;
pub mod record;

pub use record::{ConnectionRecord, Namespace};

pub const CONNECTION_KEY_PREFIX: &str = "connection_";

/// Minimal key-value contract the protocol engine persists through. A batch
/// commit is observed atomically by `get`.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get(&self, key: &str) -> ExchangeResult<String>;

    async fn put(&self, key: &str, value: &str) -> ExchangeResult<()>;

    /// Fails with `Conflict` when the key already holds a value.
    async fn put_new(&self, key: &str, value: &str) -> ExchangeResult<()>;

    async fn batch_put(&self, entries: Vec<(String, String)>) -> ExchangeResult<()>;

    async fn scan(&self, prefix: &str) -> ExchangeResult<Vec<(String, String)>>;
}

/// Durable view over connection records and the namespaced thread index.
///
/// Records live under `connection_<connectionID>`; the thread index maps
/// `<namespace>_<threadID>` to the connection id. Conversations we opened are
/// indexed under [Namespace::My], conversations we respond to under
/// [Namespace::Their], so a single store can hold both sides of a loopback
/// exchange.
pub struct ConnectionStore {
    repository: Arc<dyn Repository>,
}

fn connection_key(connection_id: &str) -> String {
    format!("{}{}", CONNECTION_KEY_PREFIX, connection_id)
}

fn ns_thread_key(namespace: Namespace, thread_id: &str) -> String {
    format!("{}_{}", namespace, thread_id)
}

impl ConnectionStore {
    pub fn new(repository: Arc<dyn Repository>) -> ConnectionStore {
        ConnectionStore { repository }
    }

    pub async fn save(&self, record: &ConnectionRecord) -> ExchangeResult<()> {
        let value = serde_json::to_string(record)?;
        self.repository.put(&connection_key(&record.connection_id), &value).await
    }

    /// Persists a record under a key that must not exist yet.
    pub async fn save_new(&self, record: &ConnectionRecord) -> ExchangeResult<()> {
        let value = serde_json::to_string(record)?;
        self.repository
            .put_new(&connection_key(&record.connection_id), &value)
            .await
    }

    /// Commits the record and its namespaced thread index entry in one batch.
    pub async fn save_with_ns_thread(&self, record: &ConnectionRecord) -> ExchangeResult<()> {
        let value = serde_json::to_string(record)?;
        self.repository
            .batch_put(vec![
                (connection_key(&record.connection_id), value),
                (
                    ns_thread_key(record.namespace, &record.thread_id),
                    record.connection_id.clone(),
                ),
            ])
            .await
    }

    pub async fn save_ns_thread(
        &self,
        thread_id: &str,
        namespace: Namespace,
        connection_id: &str,
    ) -> ExchangeResult<()> {
        self.repository
            .put(&ns_thread_key(namespace, thread_id), connection_id)
            .await
    }

    pub async fn get(&self, connection_id: &str) -> ExchangeResult<ConnectionRecord> {
        let value = self.repository.get(&connection_key(connection_id)).await?;
        serde_json::from_str(&value).map_err(|err| {
            ExchangeError::from_msg(
                ExchangeErrorKind::StoreIo,
                format!("Stored connection record {} is corrupted: {}", connection_id, err),
            )
        })
    }

    pub async fn get_by_ns_thread(&self, namespace: Namespace, thread_id: &str) -> ExchangeResult<ConnectionRecord> {
        let connection_id = self
            .repository
            .get(&ns_thread_key(namespace, thread_id))
            .await
            .map_err(|err| match err.kind() {
                ExchangeErrorKind::NotFound => ExchangeError::from_msg(
                    ExchangeErrorKind::NotFound,
                    format!("No connection indexed under thread {} in namespace {}", thread_id, namespace),
                ),
                _ => err,
            })?;
        self.get(&connection_id).await
    }

    pub async fn query(&self, state_filter: Option<&str>) -> ExchangeResult<Vec<ConnectionRecord>> {
        let entries = self.repository.scan(CONNECTION_KEY_PREFIX).await?;
        let mut records = Vec::new();
        for (key, value) in entries {
            let record: ConnectionRecord = serde_json::from_str(&value).map_err(|err| {
                ExchangeError::from_msg(
                    ExchangeErrorKind::StoreIo,
                    format!("Stored connection record under {} is corrupted: {}", key, err),
                )
            })?;
            if state_filter.map_or(true, |state| record.state == state) {
                records.push(record);
            }
        }
        Ok(records)
    }
}
