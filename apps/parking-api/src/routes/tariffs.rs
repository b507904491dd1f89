//! Tariff configuration routes.
//!
//! - `POST /tariffs` activates a new rule version for its category
//! - `GET /tariffs/current` lists the active rules (one per category)
//! - `GET /tariffs/history?category=` lists every version, newest first
//! - `GET /tariffs/:id` one version, e.g. the snapshot a movement was priced with

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use parking_core::validation::validate_uuid;
use parking_core::{TariffDraft, TariffRule};
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tariffs", post(create_tariff))
        .route("/tariffs/current", get(current_tariffs))
        .route("/tariffs/history", get(tariff_history))
        .route("/tariffs/:id", get(get_tariff))
}

async fn create_tariff(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(draft): ApiJson<TariffDraft>,
) -> ApiResult<Json<TariffRule>> {
    let rule = state
        .db
        .tariffs()
        .replace_active(&auth.tenant_id, draft, Utc::now())
        .await?;

    tracing::info!(
        tenant_id = %auth.tenant_id,
        user_id = %auth.user_id,
        category = %rule.category,
        "Tariff updated"
    );

    Ok(Json(rule))
}

/// With `?category=` the single active rule is returned in the list, or
/// `NO_ACTIVE_TARIFF` when the category was never priced.
async fn current_tariffs(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> ApiResult<Json<Vec<TariffRule>>> {
    let tariffs = state.db.tariffs();

    let rules = match query.category.as_deref() {
        Some(category) => {
            let category = parking_core::validation::validate_category(category)?;
            vec![tariffs.resolve_active(&auth.tenant_id, &category).await?]
        }
        None => tariffs.list_active(&auth.tenant_id).await?,
    };

    Ok(Json(rules))
}

async fn tariff_history(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> ApiResult<Json<Vec<TariffRule>>> {
    let category = query
        .category
        .ok_or_else(|| ApiError::validation("category is required"))?;
    let category = parking_core::validation::validate_category(&category)?;

    let rules = state.db.tariffs().history(&auth.tenant_id, &category).await?;
    Ok(Json(rules))
}

async fn get_tariff(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<TariffRule>> {
    validate_uuid(&id)?;

    let rule = state
        .db
        .tariffs()
        .get(&auth.tenant_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("TariffRule", &id))?;

    Ok(Json(rule))
}
