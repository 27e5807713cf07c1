//! Split application, preview and transaction history endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::calculator::SplitCalculator;
use crate::error::{SplitError, SplitResult};
use crate::model::{
    Actor, ApplySplitInput, PaymentMethod, SplitOutcome, SplitRule, SplitTransaction,
};
use crate::use_cases::TransactionPage;
use crate::AppState;

/// Body of POST /api/splits/apply
#[derive(Debug, Deserialize)]
pub struct ApplySplitRequest {
    pub amount_total_cents: i64,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub split_config_id: Option<Uuid>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Body of POST /api/splits/preview
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub amount_total_cents: i64,
    pub rules: Vec<SplitRule>,
}

/// Query parameters for transaction listing
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> SplitResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| SplitError::Validation(e.body_text()))
}

/// POST /api/splits/apply
pub async fn apply_split(
    State(state): State<AppState>,
    actor: Actor,
    payload: Result<Json<ApplySplitRequest>, JsonRejection>,
) -> SplitResult<(StatusCode, Json<SplitTransaction>)> {
    let request = json_body(payload)?;

    let input = ApplySplitInput {
        clinic_id: actor.clinic_id,
        user_id: actor.user_id,
        amount_total_cents: request.amount_total_cents,
        payment_method: request.payment_method,
        split_config_id: request.split_config_id,
        idempotency_key: request.idempotency_key,
    };

    let transaction = state.apply_split.execute(input).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// POST /api/splits/preview
///
/// Runs the calculator without resolving a configuration or persisting.
pub async fn preview_split(
    _actor: Actor,
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> SplitResult<Json<SplitOutcome>> {
    let request = json_body(payload)?;
    let outcome = SplitCalculator::calculate(request.amount_total_cents, &request.rules)?;
    Ok(Json(outcome))
}

/// GET /api/splits/transactions?page=N
pub async fn list_transactions(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<TransactionQuery>,
) -> SplitResult<Json<TransactionPage>> {
    let page = state
        .queries
        .list_transactions(actor.clinic_id, params.page)
        .await?;
    Ok(Json(page))
}

/// GET /api/splits/transactions/:id
pub async fn get_transaction(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> SplitResult<Json<SplitTransaction>> {
    Ok(Json(state.queries.get_transaction(actor.clinic_id, id).await?))
}
