//! # Parking API
//!
//! HTTP JSON server for the multi-tenant parking backend.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Parking API Routes                             │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐ │
//! │  │  Tariffs       │  │  Movements     │  │  Shifts                    │ │
//! │  │                │  │                │  │                            │ │
//! │  │ • POST /       │  │ • check-in     │  │ • open / close             │ │
//! │  │ • current      │  │ • check-out    │  │ • current                  │ │
//! │  │ • history      │  │ • :id, receipt │  │ • expected-totals, :id     │ │
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘ │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐ │
//! │  │  Payments      │  │  Reports       │  │  Health                    │ │
//! │  │                │  │                │  │                            │ │
//! │  │ • bulk         │  │ • kpis, income │  │ • GET /health (no auth)    │ │
//! │  │                │  │ • movements    │  │                            │ │
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘ │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐ │  │
//! │  │  │  SQLite      │  │  TraceLayer  │  │  JWT Auth                │ │  │
//! │  │  │ (parking-db) │  │  CorsLayer   │  │  tenant from claims      │ │  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘ │  │
//! │  └───────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::ApiConfig`]; every variable is prefixed with `PARKING_`.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::extract::FromRef;
use axum::http::HeaderValue;
use axum::Router;
use parking_db::Database;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

// Re-exports
pub use auth::{AuthContext, JwtManager};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_access_lifetime_secs);
        AppState {
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

/// Builds the full router with middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match origin {
        None => layer.allow_origin(Any),
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => layer.allow_origin(value),
            Err(_) => {
                warn!(origin, "Ignoring unparsable CORS origin; cross-origin requests denied");
                layer
            }
        },
    }
}
