//! # Error Types
//!
//! Domain-specific error types for parking-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  parking-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  parking-db errors (separate crate)                                     │
//! │  └── DbError          - Storage failures, or a CoreError raised         │
//! │                         inside a transaction                            │
//! │                                                                         │
//! │  parking-api errors                                                     │
//! │  └── ApiError         - What HTTP clients see (code + message)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → client        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations in the parking domain.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No active tariff rule exists for the tenant and vehicle category.
    ///
    /// ## When This Occurs
    /// - Check-in for a category the tenant never priced
    /// - Lookup of the current rule before any rule was configured
    #[error("No active tariff for category '{category}'")]
    NoActiveTariff { category: String },

    /// The vehicle already has an open movement.
    ///
    /// ## User Workflow
    /// ```text
    /// Check-in "ABC123"  ──► open movement #1
    /// Check-in "ABC123"  ──► VehicleAlreadyInside
    ///      │
    ///      ▼
    /// Operator sees: "Vehicle ABC123 is already inside"
    /// ```
    #[error("Vehicle {plate} is already inside")]
    VehicleAlreadyInside { plate: String },

    /// No vehicle with this plate was ever checked in for the tenant.
    #[error("Vehicle not found: {plate}")]
    VehicleNotFound { plate: String },

    /// The vehicle exists but has no open movement.
    ///
    /// ## When This Occurs
    /// - Check-out of a vehicle that already left
    /// - A retried check-out request after the first one succeeded
    #[error("Vehicle {plate} has no active stay")]
    NoActiveStay { plate: String },

    #[error("Movement not found: {0}")]
    MovementNotFound(String),

    /// The operation needs a closed movement (it has no amount due yet).
    #[error("Movement {0} is still open")]
    MovementNotClosed(String),

    /// A shift is already open for the tenant.
    #[error("A shift is already open (opened by {operator_id})")]
    ShiftAlreadyOpen { operator_id: String },

    #[error("No open shift")]
    NoOpenShift,

    #[error("Shift not found: {0}")]
    ShiftNotFound(String),

    /// Negative elapsed time passed to the charge calculator.
    #[error("Invalid duration: {minutes} minutes")]
    InvalidDuration { minutes: i64 },

    /// Tariff draft does not make sense for its billing mode.
    #[error("Invalid tariff: {reason}")]
    InvalidTariff { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn invalid_tariff(reason: impl Into<String>) -> Self {
        CoreError::InvalidTariff {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, plate with symbols).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A collection that must carry at least one element is empty.
    #[error("{field} must not be empty")]
    Empty { field: String },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }

    pub(crate) fn invalid_format(field: &str, reason: &str) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
