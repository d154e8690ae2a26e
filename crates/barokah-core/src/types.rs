//! # Domain Types
//!
//! Core domain types used throughout Barokah Commerce.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │     Order       │   │   OrderLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  customer_id    │◄──│  order_id (FK)  │       │
//! │  │  birth_date     │   │  status         │   │  unit_price     │       │
//! │  │  address        │   │  total_cents    │   │  discount_%     │       │
//! │  └─────────────────┘   │  deadline       │   │  subtotal       │       │
//! │          ▲             └─────────────────┘   └────────┬────────┘       │
//! │          │                                            │                │
//! │  ┌───────┴─────────┐   ┌─────────────────┐            │                │
//! │  │ DiscountGrant   │──►│    Product      │◄───────────┘                │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  percent        │   │  price_cents    │                             │
//! │  │  status, expiry │   │  stock (>= 0)   │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Order lines freeze product name, unit price and the applied discount at
//! submission, so later price edits or grant changes never rewrite history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;

/// Generates a new entity ID (UUID v4 string).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Customer
// =============================================================================

/// A storefront customer.
///
/// Cumulative spend is never stored here; it is derived from paid orders
/// so cancellations and refunds can never leave it stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub username: String,
    pub address: String,
    pub phone: Option<String>,
    pub birth_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Category
// =============================================================================

/// Product category (cement, bricks, paint, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on the storefront and frozen into order lines.
    pub name: String,

    pub description: Option<String>,

    /// Unit price in sen.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    pub category_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle status of an order.
///
/// ## State Graph
/// ```text
///   PROCESSING ──► PAID ──► SHIPPED ──► COMPLETED
///       │           │          │
///       └───────────┴──────────┴──────► CANCELLED
/// ```
/// PROCESSING means "awaiting payment" and is also cancelled automatically
/// once the payment deadline passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Submitted, awaiting payment confirmation.
    Processing,
    /// Payment confirmed by an admin.
    Paid,
    /// Handed to the courier.
    Shipped,
    /// Delivered; feedback may now be left.
    Completed,
    /// Cancelled by an admin, the customer, or payment expiry.
    Cancelled,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Processing,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Returns the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Processing
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PROCESSING" => Ok(OrderStatus::Processing),
            "PAID" => Ok(OrderStatus::Paid),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown order status '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub status: OrderStatus,
    pub shipping_address: String,
    /// Shipping fee in sen, included in `total_cents`.
    pub shipping_fee_cents: i64,
    /// Σ line subtotals + shipping fee.
    pub total_cents: i64,
    /// Orders still PROCESSING after this instant are cancelled by the expiry sweep.
    pub payment_deadline: DateTime<Utc>,
    /// Opaque reference to the uploaded proof of payment.
    pub proof_artifact: Option<String>,
    pub feedback: Option<String>,
    pub feedback_photo: Option<String>,
    /// True while the order holds a stock debit that has not been credited back.
    pub stock_committed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn shipping_fee(&self) -> Money {
        Money::from_cents(self.shipping_fee_cents)
    }

    /// True when the order is still awaiting payment past its deadline.
    pub fn is_payment_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == OrderStatus::Processing && now > self.payment_deadline
    }
}

// =============================================================================
// Order Line
// =============================================================================

/// A line item in an order.
/// Uses snapshot pattern to freeze product data and the applied discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of submission (frozen).
    pub product_name: String,
    /// Unit price in sen at time of submission (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// Applied discount percent, 0 when no discount applied.
    pub discount_percent: u32,
    pub discount_label: Option<String>,
    /// Discount amount in sen (whole rupiah).
    pub discount_cents: i64,
    /// unit price × quantity − discount.
    pub subtotal_cents: i64,
}

impl OrderLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    /// Line value before any discount.
    #[inline]
    pub fn gross(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// Re-derives discount and subtotal after a quantity change, keeping the
    /// locked unit price and percent.
    pub fn reprice(&mut self, quantity: i64) {
        self.quantity = quantity;
        let gross = self.gross();
        let discount = gross.percentage_discount(self.discount_percent);
        self.discount_cents = discount.cents();
        self.subtotal_cents = (gross - discount).cents();
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// A requested cart entry. The cart itself lives outside this system and is
/// passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            product_id: product_id.into(),
            quantity,
        }
    }
}

// =============================================================================
// Discount Grant
// =============================================================================

/// Whether a discount grant is currently usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    Active,
    Inactive,
}

/// Who created a discount grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantSource {
    /// Entered manually by an admin.
    Admin,
    /// Materialized by the daily birthday sweep.
    BirthdayRule,
}

/// A discount entitlement for one customer, optionally scoped to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DiscountGrant {
    pub id: String,
    pub customer_id: String,
    /// `None` means the grant applies to every product.
    pub product_id: Option<String>,
    pub percent: u32,
    pub status: GrantStatus,
    pub source: GrantSource,
    /// Message shown to the customer alongside the discount.
    pub message: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DiscountGrant {
    /// Active and not yet expired at `now`.
    pub fn is_effective(&self, now: DateTime<Utc>) -> bool {
        self.status == GrantStatus::Active && self.expires_at.map_or(true, |exp| now < exp)
    }

    /// True for grants without a product scope.
    pub fn is_general(&self) -> bool {
        self.product_id.is_none()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
