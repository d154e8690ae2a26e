//! # Error Types
//!
//! Domain-specific error types for barokah-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  barokah-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  barokah-db errors (separate crate)                                    │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - Stock debit/credit failures                    │
//! │                                                                         │
//! │  barokah-engine errors                                                 │
//! │  └── SubmissionError / TransitionError / FeedbackError / EditError     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → engine error → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A submission was attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed distinct products.
    #[error("Cart cannot have more than {max} products")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// The order state graph forbids this move.
    ///
    /// ## When This Occurs
    /// - Shipping an order that was never paid (PROCESSING → SHIPPED)
    /// - Any move out of COMPLETED or CANCELLED
    /// - Re-applying the current status (PAID → PAID)
    ///
    /// Fatal: retrying with the same arguments can never succeed.
    #[error("Illegal order transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// Feedback was submitted for an order that is not COMPLETED.
    #[error("Feedback is only accepted for completed orders (order is {status})")]
    FeedbackNotAllowed { status: OrderStatus },

    /// Order lines may only be edited before the order ships.
    #[error("Order lines cannot be edited while the order is {status}")]
    OrderNotEditable { status: OrderStatus },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
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

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
