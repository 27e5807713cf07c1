//! Create a split configuration (ADMIN/ROOT only)

use std::sync::Arc;
use tracing::info;

use orthoplus_common::{DomainEvent, EventBus};

use crate::error::{SplitError, SplitResult};
use crate::model::{Actor, NewSplitConfig, SplitConfig};
use crate::repository::SplitRepository;
use crate::validator::SplitRulesValidator;

pub struct CreateSplitConfigUseCase {
    repository: Arc<dyn SplitRepository>,
    events: Arc<EventBus>,
}

impl CreateSplitConfigUseCase {
    pub fn new(repository: Arc<dyn SplitRepository>, events: Arc<EventBus>) -> Self {
        Self { repository, events }
    }

    pub async fn execute(&self, actor: &Actor, config: NewSplitConfig) -> SplitResult<SplitConfig> {
        if !actor.role.can_manage_splits() {
            return Err(SplitError::Unauthorized(
                "Only ADMIN or ROOT users can create split configurations".to_string(),
            ));
        }
        if config.name.trim().is_empty() {
            return Err(SplitError::Validation(
                "Configuration name is required".to_string(),
            ));
        }
        if config.minimum_amount_cents < 0 {
            return Err(SplitError::Validation(format!(
                "Minimum amount cannot be negative, got {} cents",
                config.minimum_amount_cents
            )));
        }
        SplitRulesValidator::validate(&config.split_rules, config.split_type).into_result()?;

        let created = self
            .repository
            .create_config(&config, actor.clinic_id, actor.user_id)
            .await?;

        info!(
            clinic_id = %created.clinic_id,
            config_id = %created.id,
            split_type = %created.split_type,
            "Created split configuration '{}'",
            created.name
        );

        self.events
            .publish(&DomainEvent::SplitConfigCreated {
                config_id: created.id,
                clinic_id: created.clinic_id,
                created_by: created.created_by,
                name: created.name.clone(),
                split_type: created.split_type.to_string(),
                timestamp: created.created_at,
            })
            .await;

        Ok(created)
    }
}
