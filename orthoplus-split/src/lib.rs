//! orthoplus-split library - payment split engine
//!
//! Divides a clinic payment between recipients according to the clinic's
//! split configuration, and records the result as an immutable transaction.
//!
//! - [`calculator`]: pure payout arithmetic in integer cents
//! - [`validator`]: rule-set checks before a configuration is stored
//! - [`use_cases`]: orchestration over a [`repository::SplitRepository`]
//! - [`api`]: axum handlers

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use orthoplus_common::EventBus;

pub mod api;
pub mod calculator;
pub mod error;
pub mod model;
pub mod repository;
pub mod use_cases;
pub mod validator;

pub use calculator::SplitCalculator;
pub use error::{SplitError, SplitResult};
pub use validator::{SplitRulesValidator, ValidationOutcome};

use repository::SplitRepository;
use use_cases::{
    ApplySplitUseCase, CreateSplitConfigUseCase, DeactivateSplitConfigUseCase, SplitQueries,
};

/// Name reported by `/health` and used in startup logs
pub const SERVICE_NAME: &str = "orthoplus-split";

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub apply_split: Arc<ApplySplitUseCase>,
    pub create_config: Arc<CreateSplitConfigUseCase>,
    pub deactivate_config: Arc<DeactivateSplitConfigUseCase>,
    pub queries: Arc<SplitQueries>,
}

impl AppState {
    /// Wire every use case to the same repository and event bus
    pub fn new(repository: Arc<dyn SplitRepository>, events: Arc<EventBus>) -> Self {
        Self {
            apply_split: Arc::new(ApplySplitUseCase::new(
                Arc::clone(&repository),
                Arc::clone(&events),
            )),
            create_config: Arc::new(CreateSplitConfigUseCase::new(
                Arc::clone(&repository),
                Arc::clone(&events),
            )),
            deactivate_config: Arc::new(DeactivateSplitConfigUseCase::new(
                Arc::clone(&repository),
                events,
            )),
            queries: Arc::new(SplitQueries::new(repository)),
        }
    }
}

/// Build application router
///
/// `/health` needs no caller identity; every `/api` route does.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let configs = Router::new()
        .route(
            "/api/split-configs",
            post(api::create_config).get(api::list_configs),
        )
        .route(
            "/api/split-configs/:id/deactivate",
            post(api::deactivate_config),
        );

    let splits = Router::new()
        .route("/api/splits/apply", post(api::apply_split))
        .route("/api/splits/preview", post(api::preview_split))
        .route("/api/splits/transactions", get(api::list_transactions))
        .route("/api/splits/transactions/:id", get(api::get_transaction));

    Router::new()
        .route("/health", get(api::health))
        .merge(configs)
        .merge(splits)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
