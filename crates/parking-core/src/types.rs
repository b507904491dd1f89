//! # Domain Types
//!
//! Core domain types used throughout the parking backend.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Vehicle      │   │    Movement     │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  vehicle_id     │◄──│  movement_id    │       │
//! │  │  plate          │   │  tariff_rule_id │   │  method         │       │
//! │  │  category       │   │  status         │   │  amount         │       │
//! │  └─────────────────┘   │  amount_due     │   │  recorded_at    │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Shift       │   │ MovementStatus  │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  opening_float  │   │  Open           │   │  Cash           │       │
//! │  │  counted_*      │   │  Closed         │   │  Card           │       │
//! │  │  expected_*     │   └─────────────────┘   │  Qr             │       │
//! │  │  variance       │                         └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tariff rules live in [`crate::tariff`].
//!
//! ## Status Beside Timestamps
//! Movements and shifts carry an explicit `status` next to their nullable
//! closing timestamp. The status column is what queries filter on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Vehicle
// =============================================================================

/// A vehicle known to a tenant. Created lazily on its first check-in.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Vehicle {
    pub id: String,
    pub tenant_id: String,
    /// Normalized (trimmed, upper-case) plate. Unique per tenant.
    pub plate: String,
    pub category: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Movement Status
// =============================================================================

/// Lifecycle state of a stay: `Open → Closed`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum MovementStatus {
    /// Vehicle is inside the lot.
    Open,
    /// Vehicle left; amount due is fixed.
    Closed,
}

impl MovementStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Open => "open",
            MovementStatus::Closed => "closed",
        }
    }
}

impl FromStr for MovementStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(MovementStatus::Open),
            "closed" => Ok(MovementStatus::Closed),
            _ => Err(ValidationError::invalid_format(
                "status",
                "must be 'open' or 'closed'",
            )),
        }
    }
}

// =============================================================================
// Movement
// =============================================================================

/// One stay of one vehicle: check-in to check-out.
///
/// ## Tariff Snapshot
/// `tariff_rule_id` is captured at check-in. Check-out prices the stay with
/// that exact rule version, so a tariff change in the middle of a stay does
/// not touch it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Movement {
    pub id: String,
    pub tenant_id: String,
    pub vehicle_id: String,
    pub plate: String,
    pub category: String,
    pub tariff_rule_id: String,
    #[ts(as = "String")]
    pub checked_in_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub checked_out_at: Option<DateTime<Utc>>,
    pub amount_due: Option<Money>,
    pub status: MovementStatus,
    pub checked_in_by: String,
    pub checked_out_by: Option<String>,
}

impl Movement {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == MovementStatus::Open
    }

    /// Whole minutes between check-in and `until`, truncated, never negative.
    ///
    /// ## Example
    /// ```text
    /// checked_in_at 10:00:00, until 11:15:59  →  75
    /// checked_in_at 10:00:00, until 09:59:00  →  0 (clock skew)
    /// ```
    pub fn elapsed_minutes(&self, until: DateTime<Utc>) -> i64 {
        (until - self.checked_in_at).num_minutes().max(0)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a payment was settled. Payments arrive already settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card,
    Qr,
}

impl PaymentMethod {
    /// All methods in report order.
    pub const ALL: [PaymentMethod; 3] = [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Qr];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Qr => "qr",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "qr" => Ok(PaymentMethod::Qr),
            _ => Err(ValidationError::invalid_format(
                "method",
                "must be one of cash, card, qr",
            )),
        }
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A settled payment against a closed movement. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub tenant_id: String,
    pub movement_id: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub recorded_by: String,
    /// Decides which shift window the payment falls into.
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Shift
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ShiftStatus {
    Open,
    Closed,
}

/// A cashier shift.
///
/// ## Lifecycle
/// ```text
/// open(opening_float) ──► payments accumulate in [opened_at, now)
///                                │
///                                ▼
///                  close(counted) ──► expected_* and variance frozen
/// ```
///
/// The `expected_*` and `counted_*` columns stay `None` while the shift is
/// open; live totals are computed on demand.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Shift {
    pub id: String,
    pub tenant_id: String,
    pub operator_id: String,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub opening_float: Money,
    pub opening_note: Option<String>,
    pub counted_cash: Option<Money>,
    pub counted_card: Option<Money>,
    pub counted_qr: Option<Money>,
    pub counted_total: Option<Money>,
    pub expected_cash: Option<Money>,
    pub expected_card: Option<Money>,
    pub expected_qr: Option<Money>,
    pub expected_total: Option<Money>,
    pub variance: Option<Money>,
    pub closing_note: Option<String>,
    pub status: ShiftStatus,
}

impl Shift {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
