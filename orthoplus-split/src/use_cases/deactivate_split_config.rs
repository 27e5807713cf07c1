//! Deactivate a split configuration
//!
//! The only mutation a configuration ever sees. Deactivating an already
//! inactive configuration succeeds and publishes nothing.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use orthoplus_common::{DomainEvent, EventBus};

use crate::error::{SplitError, SplitResult};
use crate::model::{Actor, SplitConfig};
use crate::repository::{self, SplitRepository};

pub struct DeactivateSplitConfigUseCase {
    repository: Arc<dyn SplitRepository>,
    events: Arc<EventBus>,
}

impl DeactivateSplitConfigUseCase {
    pub fn new(repository: Arc<dyn SplitRepository>, events: Arc<EventBus>) -> Self {
        Self { repository, events }
    }

    pub async fn execute(&self, actor: &Actor, config_id: Uuid) -> SplitResult<SplitConfig> {
        if !actor.role.can_manage_splits() {
            return Err(SplitError::Unauthorized(
                "Only ADMIN or ROOT users can deactivate split configurations".to_string(),
            ));
        }

        let not_found =
            || SplitError::NotFound(format!("Split configuration {} not found", config_id));

        let existing = self
            .repository
            .get_config_by_id(config_id)
            .await?
            .filter(|c| c.clinic_id == actor.clinic_id)
            .ok_or_else(not_found)?;

        if !existing.is_active {
            return Ok(existing);
        }

        let updated = self
            .repository
            .deactivate_config(config_id)
            .await?
            .ok_or_else(not_found)?;

        info!(
            clinic_id = %updated.clinic_id,
            config_id = %updated.id,
            "Deactivated split configuration '{}'",
            updated.name
        );

        self.events
            .publish(&DomainEvent::SplitConfigDeactivated {
                config_id: updated.id,
                clinic_id: updated.clinic_id,
                deactivated_by: actor.user_id,
                timestamp: repository::now(),
            })
            .await;

        Ok(updated)
    }
}
