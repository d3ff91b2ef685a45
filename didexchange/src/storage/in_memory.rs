use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::errors::error::{ExchangeError, ExchangeErrorKind, ExchangeResult};
use crate::storage::Repository;

/// Process-local repository backed by a `RwLock`ed map. Batches are applied
/// under a single write lock, so readers observe them atomically.
pub struct InMemoryRepository {
    store: RwLock<HashMap<String, String>>,
}

impl InMemoryRepository {
    pub fn new() -> InMemoryRepository {
        InMemoryRepository {
            store: Default::default(),
        }
    }

    fn lock_store_read(&self) -> ExchangeResult<RwLockReadGuard<HashMap<String, String>>> {
        self.store.read().map_err(|err| {
            error!("Unable to read-lock in-memory store: {:?}", err);
            ExchangeError::from_msg(
                ExchangeErrorKind::StoreIo,
                format!("Unable to read-lock in-memory store: {:?}", err),
            )
        })
    }

    fn lock_store_write(&self) -> ExchangeResult<RwLockWriteGuard<HashMap<String, String>>> {
        self.store.write().map_err(|err| {
            error!("Unable to write-lock in-memory store: {:?}", err);
            ExchangeError::from_msg(
                ExchangeErrorKind::StoreIo,
                format!("Unable to write-lock in-memory store: {:?}", err),
            )
        })
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get(&self, key: &str) -> ExchangeResult<String> {
        let store = self.lock_store_read()?;
        store.get(key).cloned().ok_or(ExchangeError::from_msg(
            ExchangeErrorKind::NotFound,
            format!("No value stored under key: {}", key),
        ))
    }

    async fn put(&self, key: &str, value: &str) -> ExchangeResult<()> {
        let mut store = self.lock_store_write()?;
        store.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn put_new(&self, key: &str, value: &str) -> ExchangeResult<()> {
        let mut store = self.lock_store_write()?;
        if store.contains_key(key) {
            return Err(ExchangeError::from_msg(
                ExchangeErrorKind::Conflict,
                format!("Value already stored under key: {}", key),
            ));
        }
        store.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn batch_put(&self, entries: Vec<(String, String)>) -> ExchangeResult<()> {
        let mut store = self.lock_store_write()?;
        for (key, value) in entries {
            store.insert(key, value);
        }
        Ok(())
    }

    async fn scan(&self, prefix: &str) -> ExchangeResult<Vec<(String, String)>> {
        let store = self.lock_store_read()?;
        Ok(store
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}
