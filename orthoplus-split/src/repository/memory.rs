//! In-memory repository
//!
//! Keeps records in insertion order and counts calls, so tests can assert
//! that an operation never reached storage.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{new_config, new_transaction, SplitRepository};
use crate::error::{SplitError, SplitResult};
use crate::model::{
    ApplySplitInput, NewSplitConfig, SplitConfig, SplitOutcome, SplitTransaction,
};

#[derive(Default)]
pub struct InMemorySplitRepository {
    configs: RwLock<Vec<SplitConfig>>,
    transactions: RwLock<Vec<SplitTransaction>>,
    calls: AtomicUsize,
    transaction_writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemorySplitRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fully-formed configuration as-is (ids and timestamps included)
    pub async fn insert_config(&self, config: SplitConfig) {
        self.configs.write().await.push(config);
    }

    /// Number of repository calls made through the trait
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `create_transaction` calls, successful or not
    pub fn transaction_writes(&self) -> usize {
        self.transaction_writes.load(Ordering::SeqCst)
    }

    /// Make every write fail with a storage error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn check_writable(&self) -> SplitResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SplitError::Storage(orthoplus_common::Error::Internal(
                "storage unavailable".to_string(),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SplitRepository for InMemorySplitRepository {
    async fn get_config_by_id(&self, id: Uuid) -> SplitResult<Option<SplitConfig>> {
        self.record_call();
        let configs = self.configs.read().await;
        Ok(configs.iter().find(|c| c.id == id).cloned())
    }

    async fn get_active_configs(&self, clinic_id: Uuid) -> SplitResult<Vec<SplitConfig>> {
        self.record_call();
        let configs = self.configs.read().await;
        Ok(configs
            .iter()
            .filter(|c| c.clinic_id == clinic_id && c.is_active)
            .cloned()
            .collect())
    }

    async fn list_configs(&self, clinic_id: Uuid) -> SplitResult<Vec<SplitConfig>> {
        self.record_call();
        let configs = self.configs.read().await;
        let mut found: Vec<SplitConfig> = configs
            .iter()
            .filter(|c| c.clinic_id == clinic_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn create_config(
        &self,
        config: &NewSplitConfig,
        clinic_id: Uuid,
        user_id: Uuid,
    ) -> SplitResult<SplitConfig> {
        self.record_call();
        self.check_writable()?;
        let record = new_config(config, clinic_id, user_id);
        self.configs.write().await.push(record.clone());
        Ok(record)
    }

    async fn deactivate_config(&self, id: Uuid) -> SplitResult<Option<SplitConfig>> {
        self.record_call();
        self.check_writable()?;
        let mut configs = self.configs.write().await;
        Ok(configs.iter_mut().find(|c| c.id == id).map(|c| {
            c.is_active = false;
            c.clone()
        }))
    }

    async fn create_transaction(
        &self,
        input: &ApplySplitInput,
        clinic_id: Uuid,
        user_id: Uuid,
        results: &SplitOutcome,
        config: &SplitConfig,
    ) -> SplitResult<SplitTransaction> {
        self.record_call();
        self.transaction_writes.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;

        let mut transactions = self.transactions.write().await;
        if let Some(key) = &input.idempotency_key {
            let taken = transactions
                .iter()
                .any(|t| t.clinic_id == clinic_id && t.idempotency_key.as_ref() == Some(key));
            if taken {
                return Err(SplitError::DuplicateTransaction(key.clone()));
            }
        }

        let record = new_transaction(input, clinic_id, user_id, results, config);
        transactions.push(record.clone());
        Ok(record)
    }

    async fn find_transaction_by_idempotency_key(
        &self,
        clinic_id: Uuid,
        key: &str,
    ) -> SplitResult<Option<SplitTransaction>> {
        self.record_call();
        let transactions = self.transactions.read().await;
        Ok(transactions
            .iter()
            .find(|t| t.clinic_id == clinic_id && t.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn get_transaction(
        &self,
        clinic_id: Uuid,
        id: Uuid,
    ) -> SplitResult<Option<SplitTransaction>> {
        self.record_call();
        let transactions = self.transactions.read().await;
        Ok(transactions
            .iter()
            .find(|t| t.clinic_id == clinic_id && t.id == id)
            .cloned())
    }

    async fn count_transactions(&self, clinic_id: Uuid) -> SplitResult<i64> {
        self.record_call();
        let transactions = self.transactions.read().await;
        Ok(transactions.iter().filter(|t| t.clinic_id == clinic_id).count() as i64)
    }

    async fn list_transactions(
        &self,
        clinic_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> SplitResult<Vec<SplitTransaction>> {
        self.record_call();
        let transactions = self.transactions.read().await;
        let mut found: Vec<SplitTransaction> = transactions
            .iter()
            .filter(|t| t.clinic_id == clinic_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(found
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}
