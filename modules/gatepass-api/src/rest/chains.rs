use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;

use gatepass_common::GatePassError;

use super::ApiError;
use crate::auth::CurrentUser;
use crate::AppState;

#[derive(Deserialize)]
pub struct SetChainBody {
    approver_ids: Vec<Uuid>,
}

pub async fn get_chain(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(request_type_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.engine.is_admin(user.id).await? {
        return Err(GatePassError::Forbidden("chain configuration requires admin access".into()).into());
    }

    let chain = state.engine.chain_for_type(request_type_id).await?;
    Ok(Json(serde_json::json!({ "chain": chain })))
}

pub async fn set_chain(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(request_type_id): Path<Uuid>,
    Json(body): Json<SetChainBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .set_chain(&user, request_type_id, &body.approver_ids)
        .await?;

    Ok(Json(serde_json::json!({ "ok": true })))
}
