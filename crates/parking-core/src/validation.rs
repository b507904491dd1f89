//! # Validation Module
//!
//! Input validation for the parking API. Everything here runs before a
//! request touches storage.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: HTTP extractor (axum Json)                                    │
//! │  └── Shape and types (deserialization)                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Plate/category format, amounts, notes, ids                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── partial UNIQUE indexes (one open stay, one open shift, ...)        │
//! │  └── foreign keys                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use parking_core::validation::normalize_plate;
//!
//! assert_eq!(normalize_plate(" abc123 ").unwrap(), "ABC123");
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_PLATE_LEN: usize = 12;
pub const MAX_CATEGORY_LEN: usize = 30;
pub const MAX_NOTE_LEN: usize = 500;

/// Upper bound for any amount an operator types in (payments, float,
/// counted totals), in minor units. Sums of bounded amounts stay far from
/// `i64::MAX`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Most payments accepted in one bulk request.
pub const MAX_BULK_PAYMENTS: usize = 50;

// =============================================================================
// String Validators
// =============================================================================

/// Normalizes a license plate: trimmed, upper-case.
///
/// ## Rules
/// - Must not be empty
/// - At most 12 characters
/// - Letters, digits and hyphens only
///
/// ## Example
/// ```rust
/// use parking_core::validation::normalize_plate;
///
/// assert_eq!(normalize_plate("xyz-12a").unwrap(), "XYZ-12A");
/// assert!(normalize_plate("").is_err());
/// assert!(normalize_plate("AB 123").is_err());
/// ```
pub fn normalize_plate(plate: &str) -> ValidationResult<String> {
    let plate = plate.trim();

    if plate.is_empty() {
        return Err(ValidationError::required("plate"));
    }

    if plate.chars().count() > MAX_PLATE_LEN {
        return Err(ValidationError::TooLong {
            field: "plate".to_string(),
            max: MAX_PLATE_LEN,
        });
    }

    if !plate.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::invalid_format(
            "plate",
            "must contain only letters, digits and hyphens",
        ));
    }

    Ok(plate.to_ascii_uppercase())
}

/// Normalizes a vehicle category: trimmed, lower-case.
///
/// Categories are tenant-defined ("car", "motorcycle", "bicycle", ...).
pub fn validate_category(category: &str) -> ValidationResult<String> {
    let category = category.trim();

    if category.is_empty() {
        return Err(ValidationError::required("category"));
    }

    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err(ValidationError::TooLong {
            field: "category".to_string(),
            max: MAX_CATEGORY_LEN,
        });
    }

    if !category
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "category",
            "must contain only letters, digits, hyphens and underscores",
        ));
    }

    Ok(category.to_lowercase())
}

/// Trims an optional free-text note; blank notes become `None`.
pub fn validate_note(note: Option<&str>) -> ValidationResult<Option<String>> {
    match note.map(str::trim) {
        None | Some("") => Ok(None),
        Some(n) if n.chars().count() > MAX_NOTE_LEN => Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LEN,
        }),
        Some(n) => Ok(Some(n.to_string())),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Rejects amounts above [`MAX_AMOUNT`].
pub fn validate_amount_cap(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.minor() > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT,
        });
    }
    Ok(())
}

/// Payment amounts must be above zero and at most [`MAX_AMOUNT`].
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    validate_amount_cap("amount", amount)
}

/// Counted totals and the opening float may be zero, never negative.
pub fn validate_non_negative_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    validate_amount_cap(field, amount)
}

pub fn validate_opening_float(amount: Money) -> ValidationResult<()> {
    validate_non_negative_amount("openingFloat", amount)
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates an entity id from a path segment or payload.
///
/// ## Example
/// ```rust
/// use parking_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required("id"));
    }

    uuid::Uuid::parse_str(id)
        .map_err(|_| ValidationError::invalid_format("id", "must be a valid UUID"))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
