//! # parking-core: Pure Business Logic for the Parking Backend
//!
//! Tariff rules, charge computation, shift reconciliation and report math as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Parking Backend Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 parking-api (axum, JSON over HTTP)              │   │
//! │  │   check-in ─► check-out ─► payments ─► shifts ─► reports        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ parking-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌──────────┐         │   │
//! │  │   │  tariff  │ │  charge  │ │ reconcile │ │  report  │         │   │
//! │  │   │  rules   │ │  tiers   │ │ variance  │ │ prorate  │         │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └──────────┘         │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 parking-db (SQLite via sqlx)                    │   │
//! │  │        transactions, partial unique indexes, repositories       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Vehicle, Movement, Payment, Shift and their status enums
//! - [`tariff`] - Tariff rules, billing modes, draft validation
//! - [`charge`] - The charge calculator
//! - [`reconcile`] - Expected vs counted totals at shift close
//! - [`report`] - Date ranges, paging, proration, report shapes
//! - [`money`] - Integer money
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use parking_core::charge::compute_charge;
//! use parking_core::tariff::{BillingMode, TariffDraft, TariffRule};
//! use parking_core::Money;
//!
//! let draft = TariffDraft {
//!     category: "car".into(),
//!     billing_mode: BillingMode::Hour,
//!     per_minute_rate: Money::zero(),
//!     per_hour_rate: Money::from_minor(2000),
//!     per_day_rate: Money::zero(),
//!     minutes_to_hours_threshold: 0,
//!     hours_to_days_threshold: 0,
//!     hour_rounding: Default::default(),
//!     day_rounding: Default::default(),
//! }
//! .normalize()
//! .unwrap();
//! let rule = TariffRule::from_draft("rule-1", "tenant-1", draft, Utc::now());
//!
//! // Two started hours
//! assert_eq!(compute_charge(61, &rule).unwrap().amount.minor(), 4000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod charge;
pub mod error;
pub mod money;
pub mod reconcile;
pub mod report;
pub mod tariff;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use charge::{compute_charge, Charge, TimeBreakdown};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use reconcile::{reconcile, CountedTotals, MethodTotals, Reconciliation};
pub use tariff::{BillingMode, Rounding, TariffDraft, TariffRule};
pub use types::*;
