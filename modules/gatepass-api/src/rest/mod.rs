pub mod chains;
pub mod requests;

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::warn;

use gatepass_common::GatePassError;

use crate::auth::CurrentUser;
use crate::AppState;

/// Wraps the domain error for the HTTP edge. Every taxonomy entry maps to a
/// distinct status; anything unexpected collapses to a generic 500 so storage
/// details never reach a caller.
#[derive(Debug)]
pub struct ApiError(pub GatePassError);

impl From<GatePassError> for ApiError {
    fn from(err: GatePassError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            GatePassError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
            GatePassError::Authentication => (
                StatusCode::UNAUTHORIZED,
                "authentication required".to_string(),
            ),
            GatePassError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            GatePassError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            GatePassError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            GatePassError::Database(e) => {
                warn!(error = %e, "Request failed on storage");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
            GatePassError::Migrate(e) => {
                warn!(error = %e, "Request failed on migration state");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
            GatePassError::Internal(m) => {
                warn!(error = %m, "Request failed internally");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Profile of the authenticated caller, with the admin flag the chain
/// administration UI keys off.
pub async fn me(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let is_admin = state.engine.is_admin(user.id).await?;
    Ok(Json(serde_json::json!({
        "user": {
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "is_admin": is_admin,
        }
    })))
}

pub async fn request_types(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let types = state.engine.list_request_types().await?;
    Ok(Json(serde_json::json!({ "request_types": types })))
}
