//! Cash shift routes.
//!
//! ## Close Flow
//! ```text
//! POST /shifts/close {countedCash, countedCard, countedQr}
//!         │
//!         ▼
//! ShiftRepository::close ──► expected over [opened_at, now)
//!         │                  variance = counted − expected
//!         ▼
//! |variance| ≥ PARKING_VARIANCE_WARN_THRESHOLD ?
//!         │ yes: warn! + "warning" in the body
//!         ▼
//! 200 {shift, expected, counted, variance, expectedCashInDrawer,
//!      ticketStats, ticketsTotal, warning?}
//! ```
//! A variance never blocks the close.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use parking_core::validation::validate_uuid;
use parking_core::{CountedTotals, Money, Shift};
use parking_db::ShiftReport;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::AuthContext;
use crate::error::{ApiJson, ApiPath, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftRequest {
    #[serde(default)]
    pub opening_float: Money,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseShiftRequest {
    #[serde(default)]
    pub counted_cash: Money,
    #[serde(default)]
    pub counted_card: Money,
    #[serde(default)]
    pub counted_qr: Money,
    #[serde(default)]
    pub note: Option<String>,
}

impl CloseShiftRequest {
    fn counted(&self) -> CountedTotals {
        CountedTotals {
            cash: self.counted_cash,
            card: self.counted_card,
            qr: self.counted_qr,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseShiftResponse {
    #[serde(flatten)]
    pub report: ShiftReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/shifts/open", post(open_shift))
        .route("/shifts/current", get(current_shift))
        .route("/shifts/expected-totals", get(expected_totals))
        .route("/shifts/close", post(close_shift))
        .route("/shifts/:id", get(get_shift))
}

async fn open_shift(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<OpenShiftRequest>,
) -> ApiResult<(StatusCode, Json<Shift>)> {
    let shift = state
        .db
        .shifts()
        .open(
            &auth.tenant_id,
            &auth.user_id,
            req.opening_float,
            req.note.as_deref(),
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(shift)))
}

/// `null` when no shift is open.
async fn current_shift(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Option<Shift>>> {
    let shift = state.db.shifts().current(&auth.tenant_id).await?;
    Ok(Json(shift))
}

async fn expected_totals(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<ShiftReport>> {
    let report = state
        .db
        .shifts()
        .live_summary(&auth.tenant_id, Utc::now())
        .await?;
    Ok(Json(report))
}

async fn close_shift(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CloseShiftRequest>,
) -> ApiResult<Json<CloseShiftResponse>> {
    let report = state
        .db
        .shifts()
        .close(
            &auth.tenant_id,
            &auth.user_id,
            req.counted(),
            req.note.as_deref(),
            Utc::now(),
        )
        .await?;

    let warning = report
        .reconciliation()
        .and_then(|r| r.warning(state.config.variance_warn_threshold));

    if let Some(message) = &warning {
        warn!(
            tenant_id = %auth.tenant_id,
            shift_id = %report.shift.id,
            variance = ?report.variance,
            "{}",
            message
        );
    }

    Ok(Json(CloseShiftResponse { report, warning }))
}

async fn get_shift(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<ShiftReport>> {
    validate_uuid(&id)?;

    let report = state
        .db
        .shifts()
        .detail(&auth.tenant_id, &id, Utc::now())
        .await?;

    Ok(Json(report))
}
