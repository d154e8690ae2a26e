//! # barokah-core: Pure Business Logic for Barokah Commerce
//!
//! Order lifecycle rules, discount priority, loyalty rules and cart pricing
//! for a building-materials storefront, as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Barokah Commerce Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Storefront / Admin (external, not in this repo)        │   │
//! │  │     Cart preview ──► Checkout ──► Admin status edits            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       barokah-engine (atomic units, notifications, sweeps)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ barokah-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌───────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐ │   │
//! │  │  │  money  │ │ lifecycle │ │ discount │ │ loyalty │ │pricing │ │   │
//! │  │  └─────────┘ └───────────┘ └──────────┘ └─────────┘ └────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 barokah-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Customer, Product, Order, DiscountGrant)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`lifecycle`] - Order state graph and stock effects
//! - [`discount`] - Discount priority resolution
//! - [`loyalty`] - Loyalty, birthday and top-product rules
//! - [`pricing`] - Cart pricing
//! - [`notification`] - Notification intents
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use barokah_core::lifecycle::plan_transition;
//! use barokah_core::{Money, OrderStatus};
//!
//! let line = Money::from_major(3_000_000);
//! assert_eq!(line.percentage_discount(10), Money::from_major(300_000));
//!
//! assert!(plan_transition(OrderStatus::Processing, OrderStatus::Shipped, true).is_err());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod discount;
pub mod error;
pub mod lifecycle;
pub mod loyalty;
pub mod money;
pub mod notification;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use discount::{BirthdayDiscountMode, DiscountDecision, DiscountRule, PromotionPolicy};
pub use error::{CoreError, CoreResult, ValidationError};
pub use lifecycle::{Actor, StockEffect, TransitionPlan};
pub use loyalty::LoyaltySnapshot;
pub use money::Money;
pub use notification::{NotificationCategory, NotificationIntent};
pub use pricing::{CartPricing, LineView};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct products in a single order.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in one order.
///
/// Bricks and tiles are bought by the thousand, so this is generous.
pub const MAX_ITEM_QUANTITY: i64 = 100_000;

/// Largest price or shipping fee in sen: Rp 99.999.999,99, the range of a
/// `DECIMAL(10,2)` column.
pub const MAX_PRICE_CENTS: i64 = 9_999_999_999;

// The largest possible order (every line at the price and quantity caps,
// plus the largest fee) must fit in an i64 count of sen.
const _: () = assert!(
    MAX_PRICE_CENTS * MAX_ITEM_QUANTITY * MAX_CART_ITEMS as i64 + MAX_PRICE_CENTS < i64::MAX / 2
);

/// Hours a customer has to pay before a PROCESSING order is cancelled.
pub const DEFAULT_PAYMENT_WINDOW_HOURS: i64 = 24;
