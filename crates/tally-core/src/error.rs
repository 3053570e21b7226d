//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Totals and document rule violations            │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  tally-ledger errors (orchestrator)                                    │
//! │  └── LedgerError      - What callers see                               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError::InvalidInput         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant here is an input problem. None of them can be caused by
//! storage state, so the orchestrator reports all of them as invalid input.

use chrono::NaiveDate;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations detected by pure calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A line item carries a negative quantity, price or discount.
    #[error("Line {index}: {field} must not be negative")]
    NegativeLineValue { index: usize, field: &'static str },

    /// A per-line discount exceeds the line's gross amount.
    #[error("Line {index}: discount {discount_cents} exceeds line amount {gross_cents}")]
    LineDiscountTooLarge {
        index: usize,
        discount_cents: i64,
        gross_cents: i64,
    },

    /// The cart discount exceeds the subtotal it is applied to.
    #[error("Discount {discount_cents} exceeds subtotal {subtotal_cents}")]
    DiscountTooLarge {
        discount_cents: i64,
        subtotal_cents: i64,
    },

    /// A document-level amount (discount, transport) is negative.
    #[error("{field} must not be negative")]
    NegativeAmount { field: &'static str },

    /// Arithmetic left the i64 cent range.
    #[error("Amount overflow while computing {context}")]
    Overflow { context: &'static str },

    /// A report period ends before it starts, or past the last date.
    #[error("Period {from} to {to} is not a valid date range")]
    InvalidPeriod { from: NaiveDate, to: NaiveDate },

    /// A payment names both a customer and a supplier, or neither.
    #[error("Payment must target exactly one of customer or supplier")]
    AmbiguousPaymentTarget,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised at the boundary before any storage is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::LineDiscountTooLarge {
            index: 1,
            discount_cents: 600,
            gross_cents: 500,
        };
        assert_eq!(
            err.to_string(),
            "Line 1: discount 600 exceeds line amount 500"
        );

        let err = CoreError::NegativeLineValue {
            index: 0,
            field: "quantity",
        };
        assert_eq!(err.to_string(), "Line 0: quantity must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
