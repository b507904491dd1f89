//! Bulk payment registration against a closed movement.
//!
//! The whole batch is recorded or none of it: one bad amount rejects the
//! request before anything is written.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use parking_core::validation::validate_uuid;
use parking_core::{Money, Payment, PaymentMethod};
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::error::{ApiJson, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEntry {
    pub method: PaymentMethod,
    pub amount: Money,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPaymentRequest {
    pub movement_id: String,
    pub payments: Vec<PaymentEntry>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/payments/bulk", post(record_bulk))
}

async fn record_bulk(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<BulkPaymentRequest>,
) -> ApiResult<(StatusCode, Json<Vec<Payment>>)> {
    validate_uuid(&req.movement_id)?;

    let entries: Vec<(PaymentMethod, Money)> = req
        .payments
        .iter()
        .map(|entry| (entry.method, entry.amount))
        .collect();

    let payments = state
        .db
        .payments()
        .record_bulk(
            &auth.tenant_id,
            &auth.user_id,
            &req.movement_id,
            &entries,
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(payments)))
}
