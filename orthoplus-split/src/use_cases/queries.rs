//! Read-only views over a clinic's configurations and transactions

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{SplitError, SplitResult};
use crate::model::{SplitConfig, SplitTransaction};
use crate::repository::SplitRepository;

/// Transactions shown per history page
pub const TRANSACTIONS_PER_PAGE: i64 = 50;

/// One page of transactions, newest first
#[derive(Debug, Clone, Serialize)]
pub struct TransactionPage {
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub total: i64,
    pub transactions: Vec<SplitTransaction>,
}

impl TransactionPage {
    /// Page number actually served for `requested` out of `total` rows, plus
    /// the row offset it starts at
    ///
    /// Out-of-range requests land on the nearest real page; an empty history
    /// is served as page 1.
    fn locate(total: i64, requested: i64) -> (i64, i64) {
        let last_page = Self::page_count(total).max(1);
        let page = requested.clamp(1, last_page);
        (page, (page - 1) * TRANSACTIONS_PER_PAGE)
    }

    fn page_count(total: i64) -> i64 {
        let total = total.max(0);
        total / TRANSACTIONS_PER_PAGE + i64::from(total % TRANSACTIONS_PER_PAGE != 0)
    }
}

pub struct SplitQueries {
    repository: Arc<dyn SplitRepository>,
}

impl SplitQueries {
    pub fn new(repository: Arc<dyn SplitRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_configs(&self, clinic_id: Uuid) -> SplitResult<Vec<SplitConfig>> {
        self.repository.list_configs(clinic_id).await
    }

    /// Requested page is clamped to `[1, total_pages]`
    pub async fn list_transactions(
        &self,
        clinic_id: Uuid,
        requested_page: i64,
    ) -> SplitResult<TransactionPage> {
        let total = self.repository.count_transactions(clinic_id).await?;
        let (page, offset) = TransactionPage::locate(total, requested_page);

        let transactions = self
            .repository
            .list_transactions(clinic_id, TRANSACTIONS_PER_PAGE, offset)
            .await?;

        Ok(TransactionPage {
            page,
            page_size: TRANSACTIONS_PER_PAGE,
            total_pages: TransactionPage::page_count(total),
            total,
            transactions,
        })
    }

    pub async fn get_transaction(&self, clinic_id: Uuid, id: Uuid) -> SplitResult<SplitTransaction> {
        self.repository
            .get_transaction(clinic_id, id)
            .await?
            .ok_or_else(|| SplitError::NotFound(format!("Split transaction {} not found", id)))
    }
}
