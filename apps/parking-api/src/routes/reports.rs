//! Read-only report routes.
//!
//! Every report takes `from` / `to` (`YYYY-MM-DD`, inclusive, UTC) and
//! defaults both to today. Closed stays are dated by their check-out.
//!
//! | Path                        | Extra params                                  |
//! |-----------------------------|-----------------------------------------------|
//! | `/reports/kpis`             |                                               |
//! | `/reports/income-by-day`    | `method`                                      |
//! | `/reports/income-by-method` |                                               |
//! | `/reports/top-plates`       | `limit` (1..=50, default 10)                  |
//! | `/reports/movements`        | `status`, `category`, `plate`, `page`, `pageSize` |
//! | `/reports/shifts`           |                                               |
//! | `/reports/occupancy`        | none (current state)                          |

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use parking_core::report::{
    clamp_top_limit, CategoryCount, DailyIncome, DateRange, Kpis, MethodIncome, Page,
    PageRequest, PlateVisits,
};
use parking_core::validation::validate_category;
use parking_core::{Movement, MovementStatus, PaymentMethod, Shift};
use parking_db::MovementFilter;
use serde::Deserialize;

use crate::auth::AuthContext;
use crate::error::{ApiQuery, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub method: Option<PaymentMethod>,
    pub limit: Option<i64>,
    pub status: Option<MovementStatus>,
    pub category: Option<String>,
    pub plate: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ReportQuery {
    fn range(&self) -> ApiResult<DateRange> {
        let today = Utc::now().date_naive();
        Ok(DateRange::resolve(self.from, self.to, today)?)
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/kpis", get(kpis))
        .route("/reports/income-by-day", get(income_by_day))
        .route("/reports/income-by-method", get(income_by_method))
        .route("/reports/top-plates", get(top_plates))
        .route("/reports/movements", get(movements))
        .route("/reports/shifts", get(shifts))
        .route("/reports/occupancy", get(occupancy))
}

async fn kpis(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<Kpis>> {
    let kpis = state.db.reports().kpis(&auth.tenant_id, query.range()?).await?;
    Ok(Json(kpis))
}

/// Without `method` the day total is the sum of amounts due; with it, the
/// prorated payments of that method.
async fn income_by_day(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<Vec<DailyIncome>>> {
    let range = query.range()?;
    let reports = state.db.reports();

    let days = match query.method {
        Some(method) => {
            reports
                .income_by_day_for_method(&auth.tenant_id, range, method)
                .await?
        }
        None => reports.income_by_day(&auth.tenant_id, range).await?,
    };

    Ok(Json(days))
}

async fn income_by_method(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<Vec<MethodIncome>>> {
    let totals = state
        .db
        .reports()
        .income_by_method(&auth.tenant_id, query.range()?)
        .await?;
    Ok(Json(totals))
}

async fn top_plates(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<Vec<PlateVisits>>> {
    let plates = state
        .db
        .reports()
        .top_plates(&auth.tenant_id, query.range()?, clamp_top_limit(query.limit))
        .await?;
    Ok(Json(plates))
}

async fn movements(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<Page<Movement>>> {
    let range = query.range()?;

    let category = match query.category.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => Some(validate_category(c)?),
        _ => None,
    };

    let filter = MovementFilter {
        status: query.status,
        category,
        plate: query
            .plate
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string),
    };

    let page = state
        .db
        .reports()
        .movements(
            &auth.tenant_id,
            range,
            &filter,
            PageRequest::clamped(query.page, query.page_size),
        )
        .await?;

    Ok(Json(page))
}

async fn shifts(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<ReportQuery>,
) -> ApiResult<Json<Vec<Shift>>> {
    let shifts = state
        .db
        .reports()
        .shifts(&auth.tenant_id, query.range()?)
        .await?;
    Ok(Json(shifts))
}

async fn occupancy(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<CategoryCount>>> {
    let counts = state.db.reports().occupancy(&auth.tenant_id).await?;
    Ok(Json(counts))
}
