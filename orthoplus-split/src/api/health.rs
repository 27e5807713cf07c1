//! Liveness endpoint; answers without caller identity

use axum::Json;
use serde::Serialize;

use crate::SERVICE_NAME;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
}

impl Health {
    const UP: Health = Health {
        status: "ok",
        module: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
    };
}

/// GET /health
pub async fn health() -> Json<Health> {
    Json(Health::UP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_service_and_version() {
        let Json(body) = health().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.module, "orthoplus-split");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }
}
