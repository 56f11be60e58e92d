use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;

use gatepass_common::{Decision, GatePassError, PassPayload, RequestStatus};

use super::ApiError;
use crate::auth::CurrentUser;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateRequestBody {
    #[serde(rename = "type")]
    request_type: String,
    payload: serde_json::Value,
}

#[derive(Deserialize)]
pub struct DecisionBody {
    decision: Decision,
    comments: Option<String>,
}

pub async fn create_request(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = parse_payload(&body.request_type, body.payload)?;
    let created = state
        .engine
        .create_request(&user, &body.request_type, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn my_requests(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state.engine.list_my_requests(user.id).await?;
    Ok(Json(serde_json::json!({ "requests": requests })))
}

pub async fn my_request_counts(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let counts = state.engine.my_request_counts(user.id).await?;
    Ok(Json(counts))
}

pub async fn pending_approvals(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state.engine.list_pending_approvals(user.id).await?;
    Ok(Json(serde_json::json!({ "requests": requests })))
}

pub async fn request_detail(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.engine.request_detail(id).await?;
    Ok(Json(detail))
}

pub async fn decide(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<DecisionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .engine
        .decide(&user, id, body.decision, body.comments)
        .await?;

    let message = match status {
        RequestStatus::Approved => "request fully approved",
        RequestStatus::Rejected => "request rejected",
        RequestStatus::Pending => "approval recorded, awaiting further approvers",
    };
    Ok(Json(serde_json::json!({ "message": message, "status": status })))
}

/// Resolve the payload fields against the named type's shape. The variant is
/// fixed here, once; unknown type names are a 404 rather than a shape error.
fn parse_payload(type_name: &str, payload: serde_json::Value) -> Result<PassPayload, ApiError> {
    match type_name {
        "outward" | "inward" => {}
        other => {
            return Err(GatePassError::NotFound(format!("request type {other}")).into());
        }
    }

    let serde_json::Value::Object(mut fields) = payload else {
        return Err(GatePassError::Validation("payload must be an object".into()).into());
    };
    fields.insert("kind".to_string(), serde_json::json!(type_name));

    serde_json::from_value(serde_json::Value::Object(fields))
        .map_err(|e| GatePassError::Validation(format!("invalid payload: {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outward_fields() -> serde_json::Value {
        serde_json::json!({
            "recipient_name": "Acme Forwarding",
            "date": "2025-04-01T08:30:00Z",
            "purpose": "Sample",
            "unit": "crate",
            "quantity": 2,
            "department": "Stores",
            "priority": "High",
        })
    }

    #[test]
    fn parses_outward_payload() {
        let payload = parse_payload("outward", outward_fields()).unwrap();
        assert_eq!(payload.kind(), "outward");
    }

    #[test]
    fn unknown_type_is_not_found() {
        let err = parse_payload("sideways", outward_fields()).unwrap_err();
        assert!(matches!(err.0, GatePassError::NotFound(_)));
    }

    #[test]
    fn missing_field_is_a_validation_error() {
        let mut fields = outward_fields();
        fields.as_object_mut().unwrap().remove("quantity");
        let err = parse_payload("outward", fields).unwrap_err();
        assert!(matches!(err.0, GatePassError::Validation(_)));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let err = parse_payload("outward", serde_json::json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err.0, GatePassError::Validation(_)));
    }

    #[test]
    fn inward_fields_do_not_satisfy_outward() {
        let fields = serde_json::json!({
            "received_by": "Dana",
            "date": "2025-04-01T08:30:00Z",
            "unit": "crate",
            "quantity": 1,
            "department": "Stores",
            "priority": "Medium",
        });
        assert!(parse_payload("outward", fields.clone()).is_err());
        assert!(parse_payload("inward", fields).is_ok());
    }
}
