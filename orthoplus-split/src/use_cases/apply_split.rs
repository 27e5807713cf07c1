//! Split one payment according to the clinic's configuration
//!
//! Steps, each failing fast:
//! 1. Amount must be positive and the payment method non-blank. Nothing
//!    touches the repository before this passes.
//! 2. A repeated idempotency key returns the transaction stored the first time.
//!    Keys are trimmed; a blank key counts as no key.
//! 3. Resolve the configuration (explicit id, or best active match).
//! 4. Enforce the configuration's minimum amount.
//! 5. Calculate payouts.
//! 6. Persist the transaction and publish `SplitApplied`.

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use orthoplus_common::{DomainEvent, EventBus};

use crate::calculator::SplitCalculator;
use crate::error::{SplitError, SplitResult};
use crate::model::{ApplySplitInput, PaymentMethod, SplitConfig, SplitTransaction};
use crate::repository::SplitRepository;

pub struct ApplySplitUseCase {
    repository: Arc<dyn SplitRepository>,
    events: Arc<EventBus>,
}

impl ApplySplitUseCase {
    pub fn new(repository: Arc<dyn SplitRepository>, events: Arc<EventBus>) -> Self {
        Self { repository, events }
    }

    pub async fn execute(&self, mut input: ApplySplitInput) -> SplitResult<SplitTransaction> {
        if input.amount_total_cents <= 0 {
            debug!(
                "Rejected split for clinic {}: amount {} is not positive",
                input.clinic_id, input.amount_total_cents
            );
            return Err(SplitError::Validation(format!(
                "Amount must be positive, got {} cents",
                input.amount_total_cents
            )));
        }
        if input.payment_method.is_empty() {
            return Err(SplitError::Validation(
                "Payment method is required".to_string(),
            ));
        }
        input.idempotency_key = normalize_key(input.idempotency_key.take());

        if let Some(key) = &input.idempotency_key {
            if let Some(existing) = self
                .repository
                .find_transaction_by_idempotency_key(input.clinic_id, key)
                .await?
            {
                info!(
                    "Idempotency key {} already used in clinic {}, returning transaction {}",
                    key, input.clinic_id, existing.id
                );
                return Ok(existing);
            }
        }

        let config = self.resolve_config(&input).await?;

        if input.amount_total_cents < config.minimum_amount_cents {
            debug!(
                "Rejected split for clinic {}: {} cents below minimum {} of config {}",
                input.clinic_id, input.amount_total_cents, config.minimum_amount_cents, config.id
            );
            return Err(SplitError::Validation(format!(
                "Amount {} cents is below the configuration minimum of {} cents",
                input.amount_total_cents, config.minimum_amount_cents
            )));
        }

        let outcome = SplitCalculator::calculate(input.amount_total_cents, &config.split_rules)?;

        let transaction = match self
            .repository
            .create_transaction(&input, input.clinic_id, input.user_id, &outcome, &config)
            .await
        {
            Ok(transaction) => transaction,
            Err(SplitError::DuplicateTransaction(key)) => {
                // Lost a race with a concurrent request carrying the same key
                warn!(
                    "Concurrent split with idempotency key {} in clinic {}",
                    key, input.clinic_id
                );
                return self
                    .repository
                    .find_transaction_by_idempotency_key(input.clinic_id, &key)
                    .await?
                    .ok_or(SplitError::DuplicateTransaction(key));
            }
            Err(e) => return Err(e),
        };

        info!(
            clinic_id = %transaction.clinic_id,
            config_id = %transaction.config_id,
            amount_total_cents = transaction.amount_total_cents,
            unassigned_cents = transaction.unassigned_cents,
            "Applied split {}",
            transaction.id
        );

        self.events
            .publish(&DomainEvent::SplitApplied {
                transaction_id: transaction.id,
                clinic_id: transaction.clinic_id,
                config_id: transaction.config_id,
                amount_total_cents: transaction.amount_total_cents,
                payment_method: transaction.payment_method.to_string(),
                created_by: transaction.created_by,
                timestamp: transaction.created_at,
            })
            .await;

        Ok(transaction)
    }

    async fn resolve_config(&self, input: &ApplySplitInput) -> SplitResult<SplitConfig> {
        if let Some(config_id) = input.split_config_id {
            return self.explicit_config(input.clinic_id, config_id).await;
        }

        let candidates = self.repository.get_active_configs(input.clinic_id).await?;
        select_config(candidates, &input.payment_method).ok_or_else(|| {
            SplitError::NotFound(format!(
                "No active split configuration for payment method {} in clinic {}",
                input.payment_method, input.clinic_id
            ))
        })
    }

    async fn explicit_config(&self, clinic_id: Uuid, config_id: Uuid) -> SplitResult<SplitConfig> {
        let config = self
            .repository
            .get_config_by_id(config_id)
            .await?
            .filter(|c| c.clinic_id == clinic_id)
            .ok_or_else(|| {
                SplitError::NotFound(format!("Split configuration {} not found", config_id))
            })?;

        if !config.is_active {
            return Err(SplitError::Validation(format!(
                "Split configuration {} is inactive",
                config_id
            )));
        }

        Ok(config)
    }
}

fn normalize_key(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

/// Pick the configuration for `method` among active candidates
///
/// The most recently created match wins; equal timestamps fall back to the
/// smallest id. Independent of the order the candidates arrive in.
fn select_config(candidates: Vec<SplitConfig>, method: &PaymentMethod) -> Option<SplitConfig> {
    candidates
        .into_iter()
        .filter(|c| c.is_active && c.applies_to(method))
        .min_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)))
}
