//! # Engine Error Types
//!
//! One error enum per public operation family, so callers match only the
//! failures that operation can actually produce.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Engine Error Categories                          │
//! │                                                                         │
//! │  ┌──────────────────────┐  ┌──────────────────────┐                     │
//! │  │  SubmissionError     │  │  TransitionError     │                     │
//! │  │                      │  │                      │                     │
//! │  │  EmptyCart           │  │  OrderNotFound       │                     │
//! │  │  InsufficientStock ◄─┼──┼─ InsufficientStock   │  recoverable,       │
//! │  │  CustomerNotFound    │  │  IllegalTransition   │  nothing applied    │
//! │  │  ProductNotFound     │  │  ConcurrentModif.  ◄─┼─ retry with fresh   │
//! │  └──────────────────────┘  └──────────────────────┘  state              │
//! │                                                                         │
//! │  ┌──────────────────────┐  ┌──────────────────────┐  ┌───────────────┐ │
//! │  │  FeedbackError       │  │  EditError           │  │ EngineError   │ │
//! │  │  OrderNotCompleted   │  │  OrderNotEditable    │  │ (reads,       │ │
//! │  └──────────────────────┘  └──────────────────────┘  │  sweeps)      │ │
//! │                                                      └───────────────┘ │
//! │  Every variant family ends in `Db(DbError)` for store failures.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use barokah_core::{CoreError, OrderStatus, ValidationError};
use barokah_db::{DbError, LedgerError};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoConfigPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// General Engine Errors
// =============================================================================

/// Failures of read operations (pricing, loyalty, resolve) and sweeps.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error(transparent)]
    Rule(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Db(e) if e.is_retryable())
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(err.into())
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Rule(CoreError::Validation(err))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Submission
// =============================================================================

/// Why an order could not be created. Nothing is persisted on any of these.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart cannot have more than {max} products")]
    CartTooLarge { max: usize },

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Admin-created orders cannot start out CANCELLED.
    #[error("Orders cannot be created as {0}")]
    InvalidInitialStatus(OrderStatus),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Recoverable: the customer can lower the quantity and resubmit.
    #[error("Insufficient stock for {product_name}: only {available} left")]
    InsufficientStock {
        product_name: String,
        available: i64,
        requested: i64,
    },

    #[error(transparent)]
    Db(#[from] DbError),
}

impl SubmissionError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmissionError::Db(e) if e.is_retryable())
    }
}

impl From<CoreError> for SubmissionError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyCart => SubmissionError::EmptyCart,
            CoreError::CartTooLarge { max } => SubmissionError::CartTooLarge { max },
            CoreError::QuantityTooLarge { requested, max } => {
                SubmissionError::QuantityTooLarge { requested, max }
            }
            CoreError::Validation(v) => SubmissionError::Validation(v),
            other => SubmissionError::Validation(ValidationError::InvalidFormat {
                field: "order".to_string(),
                reason: other.to_string(),
            }),
        }
    }
}

impl From<EngineError> for SubmissionError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::CustomerNotFound(id) => SubmissionError::CustomerNotFound(id),
            EngineError::ProductNotFound(id) => SubmissionError::ProductNotFound(id),
            EngineError::Rule(core) => core.into(),
            EngineError::Db(db) => SubmissionError::Db(db),
        }
    }
}

impl From<LedgerError> for SubmissionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientStock {
                product_name,
                available,
                requested,
                ..
            } => SubmissionError::InsufficientStock {
                product_name,
                available,
                requested,
            },
            LedgerError::ProductNotFound(id) => SubmissionError::ProductNotFound(id),
            LedgerError::Db(db) => SubmissionError::Db(db),
        }
    }
}

impl From<sqlx::Error> for SubmissionError {
    fn from(err: sqlx::Error) -> Self {
        SubmissionError::Db(err.into())
    }
}

// =============================================================================
// Transitions
// =============================================================================

/// Why a status change was rejected. Nothing is persisted on any of these.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Fatal: the state graph forbids the move.
    #[error("Illegal order transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// The order was not in the status the caller expected. Refresh and retry.
    #[error("Order was modified concurrently: expected {expected}, found {actual}")]
    ConcurrentModification {
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// Re-entering a stock-holding status needs stock that is gone.
    #[error("Insufficient stock for {product_name}: only {available} left")]
    InsufficientStock {
        product_name: String,
        available: i64,
        requested: i64,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl TransitionError {
    pub fn is_retryable(&self) -> bool {
        match self {
            TransitionError::ConcurrentModification { .. } => true,
            TransitionError::Db(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<LedgerError> for TransitionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientStock {
                product_name,
                available,
                requested,
                ..
            } => TransitionError::InsufficientStock {
                product_name,
                available,
                requested,
            },
            LedgerError::ProductNotFound(id) => TransitionError::ProductNotFound(id),
            LedgerError::Db(db) => TransitionError::Db(db),
        }
    }
}

impl From<sqlx::Error> for TransitionError {
    fn from(err: sqlx::Error) -> Self {
        TransitionError::Db(err.into())
    }
}

// =============================================================================
// Feedback
// =============================================================================

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Feedback is only accepted for completed orders (order is {0})")]
    OrderNotCompleted(OrderStatus),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for FeedbackError {
    fn from(err: sqlx::Error) -> Self {
        FeedbackError::Db(err.into())
    }
}

// =============================================================================
// Admin Edits
// =============================================================================

/// Failures of admin line and shipping-fee edits.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Line {line_id} not found in order {order_id}")]
    LineNotFound { order_id: String, line_id: String },

    #[error("Order lines cannot be edited while the order is {0}")]
    OrderNotEditable(OrderStatus),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Insufficient stock for {product_name}: only {available} left")]
    InsufficientStock {
        product_name: String,
        available: i64,
        requested: i64,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<LedgerError> for EditError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientStock {
                product_name,
                available,
                requested,
                ..
            } => EditError::InsufficientStock {
                product_name,
                available,
                requested,
            },
            LedgerError::ProductNotFound(id) => EditError::ProductNotFound(id),
            LedgerError::Db(db) => EditError::Db(db),
        }
    }
}

impl From<sqlx::Error> for EditError {
    fn from(err: sqlx::Error) -> Self {
        EditError::Db(err.into())
    }
}

// =============================================================================
// Notifications
// =============================================================================

/// A notification sink refused or failed to take an intent.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Db(#[from] DbError),
}
