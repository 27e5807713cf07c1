//! Split configuration endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{SplitError, SplitResult};
use crate::model::{Actor, NewSplitConfig, SplitConfig};
use crate::AppState;

/// POST /api/split-configs
pub async fn create_config(
    State(state): State<AppState>,
    actor: Actor,
    payload: Result<Json<NewSplitConfig>, JsonRejection>,
) -> SplitResult<(StatusCode, Json<SplitConfig>)> {
    let Json(request) = payload.map_err(|e| SplitError::Validation(e.body_text()))?;
    let created = state.create_config.execute(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/split-configs
pub async fn list_configs(
    State(state): State<AppState>,
    actor: Actor,
) -> SplitResult<Json<Vec<SplitConfig>>> {
    Ok(Json(state.queries.list_configs(actor.clinic_id).await?))
}

/// POST /api/split-configs/:id/deactivate
pub async fn deactivate_config(
    State(state): State<AppState>,
    actor: Actor,
    Path(config_id): Path<Uuid>,
) -> SplitResult<Json<SplitConfig>> {
    Ok(Json(state.deactivate_config.execute(&actor, config_id).await?))
}
