//! SQLite-backed repository
//!
//! UUIDs and timestamps are stored as text, rule lists, payout lists and
//! payment-method sets as JSON text.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{new_config, new_transaction, SplitRepository};
use crate::error::{SplitError, SplitResult};
use crate::model::{
    ApplySplitInput, NewSplitConfig, PaymentMethod, SplitConfig, SplitOutcome, SplitTransaction,
};
use orthoplus_common::Error as CommonError;

const CONFIG_COLUMNS: &str = "id, clinic_id, name, split_type, split_rules, \
    apply_to_payment_methods, minimum_amount_cents, is_active, created_by, created_at";

const TRANSACTION_COLUMNS: &str = "id, clinic_id, config_id, amount_total_cents, \
    payment_method, computed_payouts, unassigned_cents, idempotency_key, created_by, created_at";

#[derive(Clone)]
pub struct SqliteSplitRepository {
    db: SqlitePool,
}

impl SqliteSplitRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(text: &str) -> SplitResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| stored_value_error("timestamp", text, e))
}

fn parse_uuid(text: &str) -> SplitResult<Uuid> {
    Uuid::parse_str(text).map_err(|e| stored_value_error("uuid", text, e))
}

fn stored_value_error(kind: &str, text: &str, err: impl std::fmt::Display) -> SplitError {
    SplitError::Storage(CommonError::InvalidInput(format!(
        "Stored {} '{}' is invalid: {}",
        kind, text, err
    )))
}

fn config_from_row(row: &SqliteRow) -> SplitResult<SplitConfig> {
    let split_type: String = row.try_get("split_type")?;
    let split_rules: String = row.try_get("split_rules")?;
    let methods: String = row.try_get("apply_to_payment_methods")?;

    Ok(SplitConfig {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        clinic_id: parse_uuid(&row.try_get::<String, _>("clinic_id")?)?,
        name: row.try_get("name")?,
        split_type: split_type
            .parse()
            .map_err(|e: String| SplitError::Storage(CommonError::InvalidInput(e)))?,
        split_rules: serde_json::from_str(&split_rules).map_err(CommonError::from)?,
        apply_to_payment_methods: serde_json::from_str(&methods).map_err(CommonError::from)?,
        minimum_amount_cents: row.try_get("minimum_amount_cents")?,
        is_active: row.try_get::<i64, _>("is_active")? != 0,
        created_by: parse_uuid(&row.try_get::<String, _>("created_by")?)?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn transaction_from_row(row: &SqliteRow) -> SplitResult<SplitTransaction> {
    let payouts: String = row.try_get("computed_payouts")?;
    let method: String = row.try_get("payment_method")?;

    Ok(SplitTransaction {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        clinic_id: parse_uuid(&row.try_get::<String, _>("clinic_id")?)?,
        config_id: parse_uuid(&row.try_get::<String, _>("config_id")?)?,
        amount_total_cents: row.try_get("amount_total_cents")?,
        payment_method: PaymentMethod::new(&method),
        computed_payouts: serde_json::from_str(&payouts).map_err(CommonError::from)?,
        unassigned_cents: row.try_get("unassigned_cents")?,
        idempotency_key: row.try_get("idempotency_key")?,
        created_by: parse_uuid(&row.try_get::<String, _>("created_by")?)?,
        created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

#[async_trait]
impl SplitRepository for SqliteSplitRepository {
    async fn get_config_by_id(&self, id: Uuid) -> SplitResult<Option<SplitConfig>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM split_configs WHERE id = ?",
            CONFIG_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(config_from_row).transpose()
    }

    async fn get_active_configs(&self, clinic_id: Uuid) -> SplitResult<Vec<SplitConfig>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM split_configs WHERE clinic_id = ? AND is_active = 1 \
             ORDER BY created_at DESC, id ASC",
            CONFIG_COLUMNS
        ))
        .bind(clinic_id.to_string())
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(config_from_row).collect()
    }

    async fn list_configs(&self, clinic_id: Uuid) -> SplitResult<Vec<SplitConfig>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM split_configs WHERE clinic_id = ? ORDER BY created_at DESC, id ASC",
            CONFIG_COLUMNS
        ))
        .bind(clinic_id.to_string())
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(config_from_row).collect()
    }

    async fn create_config(
        &self,
        config: &NewSplitConfig,
        clinic_id: Uuid,
        user_id: Uuid,
    ) -> SplitResult<SplitConfig> {
        let record = new_config(config, clinic_id, user_id);
        let rules = serde_json::to_string(&record.split_rules).map_err(CommonError::from)?;
        let methods =
            serde_json::to_string(&record.apply_to_payment_methods).map_err(CommonError::from)?;

        sqlx::query(&format!(
            "INSERT INTO split_configs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            CONFIG_COLUMNS
        ))
        .bind(record.id.to_string())
        .bind(record.clinic_id.to_string())
        .bind(&record.name)
        .bind(record.split_type.as_str())
        .bind(rules)
        .bind(methods)
        .bind(record.minimum_amount_cents)
        .bind(record.is_active as i64)
        .bind(record.created_by.to_string())
        .bind(timestamp_text(&record.created_at))
        .execute(&self.db)
        .await?;

        Ok(record)
    }

    async fn deactivate_config(&self, id: Uuid) -> SplitResult<Option<SplitConfig>> {
        sqlx::query("UPDATE split_configs SET is_active = 0 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.db)
            .await?;

        self.get_config_by_id(id).await
    }

    async fn create_transaction(
        &self,
        input: &ApplySplitInput,
        clinic_id: Uuid,
        user_id: Uuid,
        results: &SplitOutcome,
        config: &SplitConfig,
    ) -> SplitResult<SplitTransaction> {
        let record = new_transaction(input, clinic_id, user_id, results, config);
        let payouts = serde_json::to_string(&record.computed_payouts).map_err(CommonError::from)?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO split_transactions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TRANSACTION_COLUMNS
        ))
        .bind(record.id.to_string())
        .bind(record.clinic_id.to_string())
        .bind(record.config_id.to_string())
        .bind(record.amount_total_cents)
        .bind(record.payment_method.as_str())
        .bind(payouts)
        .bind(record.unassigned_cents)
        .bind(record.idempotency_key.as_deref())
        .bind(record.created_by.to_string())
        .bind(timestamp_text(&record.created_at))
        .execute(&self.db)
        .await;

        match inserted {
            Ok(_) => Ok(record),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(SplitError::DuplicateTransaction(
                    record.idempotency_key.unwrap_or_default(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_transaction_by_idempotency_key(
        &self,
        clinic_id: Uuid,
        key: &str,
    ) -> SplitResult<Option<SplitTransaction>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM split_transactions WHERE clinic_id = ? AND idempotency_key = ?",
            TRANSACTION_COLUMNS
        ))
        .bind(clinic_id.to_string())
        .bind(key)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn get_transaction(
        &self,
        clinic_id: Uuid,
        id: Uuid,
    ) -> SplitResult<Option<SplitTransaction>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM split_transactions WHERE clinic_id = ? AND id = ?",
            TRANSACTION_COLUMNS
        ))
        .bind(clinic_id.to_string())
        .bind(id.to_string())
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn count_transactions(&self, clinic_id: Uuid) -> SplitResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM split_transactions WHERE clinic_id = ?")
                .bind(clinic_id.to_string())
                .fetch_one(&self.db)
                .await?;

        Ok(count)
    }

    async fn list_transactions(
        &self,
        clinic_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> SplitResult<Vec<SplitTransaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM split_transactions WHERE clinic_id = ? \
             ORDER BY created_at DESC, id ASC LIMIT ? OFFSET ?",
            TRANSACTION_COLUMNS
        ))
        .bind(clinic_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(transaction_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SplitRule, SplitType};
    use orthoplus_common::db::init_memory_database;
    use std::collections::BTreeSet;

    async fn setup() -> SqliteSplitRepository {
        SqliteSplitRepository::new(init_memory_database().await.unwrap())
    }

    fn new_percentage_config(name: &str) -> NewSplitConfig {
        NewSplitConfig {
            name: name.to_string(),
            split_type: SplitType::Percentage,
            split_rules: vec![
                SplitRule::percentage(Uuid::new_v4(), 60).with_label("Dentist"),
                SplitRule::percentage(Uuid::new_v4(), 40),
            ],
            apply_to_payment_methods: BTreeSet::from([PaymentMethod::new("PIX")]),
            minimum_amount_cents: 500,
            is_active: true,
        }
    }

    fn apply_input(clinic_id: Uuid, key: Option<&str>) -> ApplySplitInput {
        ApplySplitInput {
            clinic_id,
            user_id: Uuid::new_v4(),
            amount_total_cents: 1000,
            payment_method: PaymentMethod::new("PIX"),
            split_config_id: None,
            idempotency_key: key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn config_round_trips_through_storage() {
        let repo = setup().await;
        let clinic = Uuid::new_v4();
        let user = Uuid::new_v4();

        let created = repo
            .create_config(&new_percentage_config("Comissões"), clinic, user)
            .await
            .unwrap();
        let loaded = repo.get_config_by_id(created.id).await.unwrap().unwrap();

        assert_eq!(loaded, created);
        assert_eq!(loaded.created_by, user);
    }

    #[tokio::test]
    async fn active_configs_are_clinic_scoped() {
        let repo = setup().await;
        let clinic = Uuid::new_v4();
        let other = Uuid::new_v4();

        repo.create_config(&new_percentage_config("Mine"), clinic, Uuid::new_v4())
            .await
            .unwrap();
        repo.create_config(&new_percentage_config("Theirs"), other, Uuid::new_v4())
            .await
            .unwrap();

        let active = repo.get_active_configs(clinic).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Mine");
    }

    #[tokio::test]
    async fn deactivated_configs_leave_the_active_set() {
        let repo = setup().await;
        let clinic = Uuid::new_v4();
        let created = repo
            .create_config(&new_percentage_config("Old"), clinic, Uuid::new_v4())
            .await
            .unwrap();

        let updated = repo.deactivate_config(created.id).await.unwrap().unwrap();

        assert!(!updated.is_active);
        assert!(repo.get_active_configs(clinic).await.unwrap().is_empty());
        assert_eq!(repo.list_configs(clinic).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transaction_round_trips_and_counts() {
        let repo = setup().await;
        let clinic = Uuid::new_v4();
        let config = repo
            .create_config(&new_percentage_config("Default"), clinic, Uuid::new_v4())
            .await
            .unwrap();
        let input = apply_input(clinic, None);
        let outcome = crate::calculator::SplitCalculator::calculate(1000, &config.split_rules)
            .unwrap();

        let created = repo
            .create_transaction(&input, clinic, input.user_id, &outcome, &config)
            .await
            .unwrap();

        let loaded = repo.get_transaction(clinic, created.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);
        assert_eq!(repo.count_transactions(clinic).await.unwrap(), 1);
        assert!(repo
            .get_transaction(Uuid::new_v4(), created.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_idempotency_key_is_reported() {
        let repo = setup().await;
        let clinic = Uuid::new_v4();
        let config = repo
            .create_config(&new_percentage_config("Default"), clinic, Uuid::new_v4())
            .await
            .unwrap();
        let input = apply_input(clinic, Some("payment-42"));
        let outcome = crate::calculator::SplitCalculator::calculate(1000, &config.split_rules)
            .unwrap();

        let first = repo
            .create_transaction(&input, clinic, input.user_id, &outcome, &config)
            .await
            .unwrap();
        let second = repo
            .create_transaction(&input, clinic, input.user_id, &outcome, &config)
            .await;

        assert!(matches!(second, Err(SplitError::DuplicateTransaction(_))));
        let found = repo
            .find_transaction_by_idempotency_key(clinic, "payment-42")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, first.id);
    }
}
