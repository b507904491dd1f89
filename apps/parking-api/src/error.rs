//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Parking API                        │
//! │                                                                         │
//! │  Client                      Rust Backend                               │
//! │  ──────                      ────────────                               │
//! │                                                                         │
//! │  POST /movements/check-in                                               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │  Handler                                                         │   │
//! │  │  Result<Json<T>, ApiError>                                       │   │
//! │  │         │                                                        │   │
//! │  │         ▼                                                        │   │
//! │  │  Storage Error? ─── DbError::QueryFailed("...") ───┐             │   │
//! │  │         │                                          │             │   │
//! │  │         ▼                                          ▼             │   │
//! │  │  Domain Error? ─── CoreError::VehicleAlreadyInside ─ ApiError ──►│   │
//! │  │         │                                                        │   │
//! │  │         ▼                                                        │   │
//! │  │  Success ───────────────────────────────────────────────────────►│   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ◄────────────────────────────────────────────────────────────────────  │
//! │                                                                         │
//! │  HTTP/1.1 409 Conflict                                                  │
//! │  {"code": "VEHICLE_ALREADY_INSIDE",                                     │
//! │   "message": "Vehicle ABC123 is already inside"}                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failures never leak their detail to the client: the detail is
//! logged with `tracing::error!` and the body carries a generic message.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_core::{CoreError, ValidationError};
use parking_db::DbError;
use serde::Serialize;

/// API error returned from handlers.
///
/// ## Serialization
/// This is what the client receives when a request fails:
/// ```json
/// {
///   "code": "NO_ACTIVE_STAY",
///   "message": "Vehicle ABC123 has no active stay"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Tariff draft rejected for its billing mode (400)
    InvalidTariff,

    /// Category has no active tariff (400)
    NoActiveTariff,

    /// A shift is already open (400)
    ShiftAlreadyOpen,

    /// No shift is open (400)
    NoOpenShift,

    /// Resource not found (404)
    NotFound,

    /// Vehicle has no open stay (404)
    NoActiveStay,

    /// Vehicle already has an open stay (409)
    VehicleAlreadyInside,

    /// Movement is still open (409)
    MovementNotClosed,

    /// Concurrent write lost a uniqueness race (409)
    Conflict,

    /// Missing or invalid bearer token (401)
    Unauthorized,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    Internal,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError
            | ErrorCode::InvalidTariff
            | ErrorCode::NoActiveTariff
            | ErrorCode::ShiftAlreadyOpen
            | ErrorCode::NoOpenShift => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound | ErrorCode::NoActiveStay => StatusCode::NOT_FOUND,
            ErrorCode::VehicleAlreadyInside
            | ErrorCode::MovementNotClosed
            | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::NoActiveTariff { .. } => ErrorCode::NoActiveTariff,
            CoreError::VehicleAlreadyInside { .. } => ErrorCode::VehicleAlreadyInside,
            CoreError::VehicleNotFound { .. }
            | CoreError::MovementNotFound(_)
            | CoreError::ShiftNotFound(_) => ErrorCode::NotFound,
            CoreError::NoActiveStay { .. } => ErrorCode::NoActiveStay,
            CoreError::MovementNotClosed(_) => ErrorCode::MovementNotClosed,
            CoreError::ShiftAlreadyOpen { .. } => ErrorCode::ShiftAlreadyOpen,
            CoreError::NoOpenShift => ErrorCode::NoOpenShift,
            CoreError::InvalidTariff { .. } => ErrorCode::InvalidTariff,
            CoreError::InvalidDuration { .. } | CoreError::Validation(_) => {
                ErrorCode::ValidationError
            }
        };

        let message = match err {
            CoreError::Validation(e) => e.to_string(),
            other => other.to_string(),
        };

        ApiError::new(code, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

// =============================================================================
// Extractor Rejections
// =============================================================================

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

/// `Json<T>` whose rejection is an [`ApiError`] body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `Query<T>` whose rejection is an [`ApiError`] body.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_status_codes() {
        let cases: Vec<(CoreError, StatusCode)> = vec![
            (
                CoreError::NoActiveTariff {
                    category: "car".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                CoreError::VehicleAlreadyInside {
                    plate: "ABC123".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                CoreError::VehicleNotFound {
                    plate: "ABC123".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                CoreError::NoActiveStay {
                    plate: "ABC123".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (CoreError::MovementNotClosed("m-1".into()), StatusCode::CONFLICT),
            (
                CoreError::ShiftAlreadyOpen {
                    operator_id: "op".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (CoreError::NoOpenShift, StatusCode::BAD_REQUEST),
            (CoreError::ShiftNotFound("s-1".into()), StatusCode::NOT_FOUND),
        ];

        for (err, status) in cases {
            let api: ApiError = DbError::Domain(err).into();
            assert_eq!(api.status(), status, "{}", api);
        }
    }

    #[test]
    fn test_storage_detail_is_hidden() {
        let api: ApiError = DbError::QueryFailed("no such table: movements".into()).into();
        assert_eq!(api.code, ErrorCode::DatabaseError);
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.message.contains("movements"));
    }

    #[test]
    fn test_unique_race_is_conflict() {
        let api: ApiError = DbError::UniqueViolation {
            field: "active tariff".into(),
            value: "car".into(),
        }
        .into();
        assert_eq!(api.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_error_body_shape() {
        let api = ApiError::new(ErrorCode::NoActiveStay, "Vehicle X has no active stay");
        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["code"], "NO_ACTIVE_STAY");
        assert_eq!(json["message"], "Vehicle X has no active stay");
    }
}
