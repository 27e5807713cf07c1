//! Caller identity extraction
//!
//! JWT verification happens at the gateway, which forwards the verified
//! identity as headers. Requests without a complete identity get 401.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::model::{Actor, Role};

pub const CLINIC_ID_HEADER: &str = "x-clinic-id";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Identity error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    MissingHeader(&'static str),
    InvalidHeader(&'static str),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingHeader(name) => format!("Missing {} header", name),
            AuthError::InvalidHeader(name) => format!("Invalid {} header", name),
        };

        let body = Json(json!({
            "error": {
                "code": "UNAUTHENTICATED",
                "message": message,
            }
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

fn header_text<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, AuthError> {
    parts
        .headers
        .get(name)
        .ok_or(AuthError::MissingHeader(name))?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader(name))
}

fn header_uuid(parts: &Parts, name: &'static str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(header_text(parts, name)?.trim()).map_err(|_| AuthError::InvalidHeader(name))
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = actor_from_headers(parts);
        if let Err(e) = &identity {
            debug!("Rejected request to {}: {:?}", parts.uri.path(), e);
        }
        identity
    }
}

fn actor_from_headers(parts: &Parts) -> Result<Actor, AuthError> {
    Ok(Actor {
        clinic_id: header_uuid(parts, CLINIC_ID_HEADER)?,
        user_id: header_uuid(parts, USER_ID_HEADER)?,
        // Absent or unknown roles fall back to MEMBER
        role: match header_text(parts, USER_ROLE_HEADER) {
            Ok(tag) => Role::from_tag(tag),
            Err(AuthError::MissingHeader(_)) => Role::Member,
            Err(e) => return Err(e),
        },
    })
}
