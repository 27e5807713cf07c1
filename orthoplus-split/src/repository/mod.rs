//! Persistence boundary for split configurations and transactions
//!
//! The use cases only see [`SplitRepository`]. [`SqliteSplitRepository`] is
//! the production implementation; [`InMemorySplitRepository`] backs tests
//! and embedding callers that do not want a database.

mod memory;
mod sqlite;

pub use memory::InMemorySplitRepository;
pub use sqlite::SqliteSplitRepository;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::error::SplitResult;
use crate::model::{
    ApplySplitInput, NewSplitConfig, SplitConfig, SplitOutcome, SplitTransaction,
};

/// Storage operations needed by the split use cases
#[async_trait]
pub trait SplitRepository: Send + Sync {
    /// Look up a configuration by id regardless of clinic or status
    async fn get_config_by_id(&self, id: Uuid) -> SplitResult<Option<SplitConfig>>;

    /// Active configurations of a clinic, most recently created first
    async fn get_active_configs(&self, clinic_id: Uuid) -> SplitResult<Vec<SplitConfig>>;

    /// All configurations of a clinic, most recently created first
    async fn list_configs(&self, clinic_id: Uuid) -> SplitResult<Vec<SplitConfig>>;

    async fn create_config(
        &self,
        config: &NewSplitConfig,
        clinic_id: Uuid,
        user_id: Uuid,
    ) -> SplitResult<SplitConfig>;

    /// Mark a configuration inactive, returning the updated record
    async fn deactivate_config(&self, id: Uuid) -> SplitResult<Option<SplitConfig>>;

    /// Insert one transaction
    ///
    /// Fails with `SplitError::DuplicateTransaction` when the input's
    /// idempotency key was already used in the clinic.
    async fn create_transaction(
        &self,
        input: &ApplySplitInput,
        clinic_id: Uuid,
        user_id: Uuid,
        results: &SplitOutcome,
        config: &SplitConfig,
    ) -> SplitResult<SplitTransaction>;

    async fn find_transaction_by_idempotency_key(
        &self,
        clinic_id: Uuid,
        key: &str,
    ) -> SplitResult<Option<SplitTransaction>>;

    async fn get_transaction(
        &self,
        clinic_id: Uuid,
        id: Uuid,
    ) -> SplitResult<Option<SplitTransaction>>;

    async fn count_transactions(&self, clinic_id: Uuid) -> SplitResult<i64>;

    /// One page of a clinic's transactions, newest first
    async fn list_transactions(
        &self,
        clinic_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> SplitResult<Vec<SplitTransaction>>;
}

/// Current time at the precision the database stores
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Build the transaction record for an insert
pub(crate) fn new_transaction(
    input: &ApplySplitInput,
    clinic_id: Uuid,
    user_id: Uuid,
    results: &SplitOutcome,
    config: &SplitConfig,
) -> SplitTransaction {
    SplitTransaction {
        id: Uuid::new_v4(),
        clinic_id,
        config_id: config.id,
        amount_total_cents: input.amount_total_cents,
        payment_method: input.payment_method.clone(),
        computed_payouts: results.payouts.clone(),
        unassigned_cents: results.unassigned_cents,
        idempotency_key: input.idempotency_key.clone(),
        created_by: user_id,
        created_at: now(),
    }
}

/// Build the configuration record for an insert
pub(crate) fn new_config(config: &NewSplitConfig, clinic_id: Uuid, user_id: Uuid) -> SplitConfig {
    SplitConfig {
        id: Uuid::new_v4(),
        clinic_id,
        name: config.name.trim().to_string(),
        split_type: config.split_type,
        split_rules: config.split_rules.clone(),
        apply_to_payment_methods: config.apply_to_payment_methods.clone(),
        minimum_amount_cents: config.minimum_amount_cents,
        is_active: config.is_active,
        created_by: user_id,
        created_at: now(),
    }
}
