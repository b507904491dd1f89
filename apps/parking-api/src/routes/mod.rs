//! HTTP route groups.
//!
//! Each submodule exposes `routes()` returning a `Router<AppState>`; they
//! are merged here. Handlers read the clock once per request and pass that
//! instant down to the repositories.

pub mod health;
pub mod movements;
pub mod payments;
pub mod reports;
pub mod shifts;
pub mod tariffs;

use axum::Router;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(tariffs::routes())
        .merge(movements::routes())
        .merge(payments::routes())
        .merge(shifts::routes())
        .merge(reports::routes())
}
