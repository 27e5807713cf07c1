//! Audit trail handler
//!
//! Writes one `audit_log` row per event (LGPD record of who changed what).

use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::SqlitePool;

use super::{DomainEvent, EventHandler};
use crate::Result;

/// Persists every event it receives to the `audit_log` table
#[derive(Clone)]
pub struct AuditLogHandler {
    db: SqlitePool,
}

impl AuditLogHandler {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventHandler for AuditLogHandler {
    fn handler_name(&self) -> &'static str {
        "audit_log"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;

        sqlx::query(
            r#"
            INSERT INTO audit_log (event_name, clinic_id, actor_id, payload, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.name())
        .bind(event.clinic_id().to_string())
        .bind(event.actor_id().to_string())
        .bind(payload)
        .bind(event.timestamp().to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.db)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn writes_one_row_per_event() {
        let pool = init_memory_database().await.unwrap();
        let handler = AuditLogHandler::new(pool.clone());
        let clinic_id = Uuid::new_v4();
        let actor = Uuid::new_v4();

        let event = DomainEvent::SplitConfigDeactivated {
            config_id: Uuid::new_v4(),
            clinic_id,
            deactivated_by: actor,
            timestamp: Utc::now(),
        };
        handler.handle(&event).await.unwrap();

        let (name, stored_clinic, stored_actor): (String, String, String) = sqlx::query_as(
            "SELECT event_name, clinic_id, actor_id FROM audit_log",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(name, "split_config.deactivated");
        assert_eq!(stored_clinic, clinic_id.to_string());
        assert_eq!(stored_actor, actor.to_string());
    }
}
