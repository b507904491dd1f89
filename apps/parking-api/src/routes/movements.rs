//! Vehicle movement routes: check-in, check-out, detail and receipt.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use parking_core::validation::validate_uuid;
use parking_core::{CoreError, Movement, PaymentMethod};
use parking_db::{CheckInReceipt, CheckOutInvoice, MovementReceipt};
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::error::{ApiJson, ApiPath, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub plate: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutRequest {
    pub plate: String,
    /// Settles the full amount with this method when given.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/movements/check-in", post(check_in))
        .route("/movements/check-out", post(check_out))
        .route("/movements/:id", get(get_movement))
        .route("/movements/:id/receipt", get(receipt))
}

async fn check_in(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CheckInRequest>,
) -> ApiResult<(StatusCode, Json<CheckInReceipt>)> {
    let receipt = state
        .db
        .movements()
        .check_in(
            &auth.tenant_id,
            &auth.user_id,
            &req.plate,
            &req.category,
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn check_out(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CheckOutRequest>,
) -> ApiResult<Json<CheckOutInvoice>> {
    let invoice = state
        .db
        .movements()
        .check_out(
            &auth.tenant_id,
            &auth.user_id,
            &req.plate,
            req.payment_method,
            Utc::now(),
        )
        .await?;

    Ok(Json(invoice))
}

async fn get_movement(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Movement>> {
    validate_uuid(&id)?;

    let movement = state
        .db
        .movements()
        .get(&auth.tenant_id, &id)
        .await?
        .ok_or(CoreError::MovementNotFound(id))?;

    Ok(Json(movement))
}

async fn receipt(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<MovementReceipt>> {
    validate_uuid(&id)?;

    let receipt = state.db.movements().receipt(&auth.tenant_id, &id).await?;
    Ok(Json(receipt))
}
