//! # Cart Pricing
//!
//! Computes per-line and cart-level totals with discounts applied.
//!
//! ## Calculation
//! ```text
//! cart total (pre-discount) = Σ unit price × quantity
//!        │
//!        ▼  (feeds the conditional birthday check)
//! per line: decision = resolve(product, cart total)
//!           discount = trunc(line gross × percent / 100) whole rupiah
//!           subtotal = line gross − discount
//!        │
//!        ▼
//! subtotal after discount = subtotal before − Σ discounts
//! ```
//!
//! The storefront preview and order submission both go through
//! [`price_cart`], so the submitted order matches what the customer saw
//! whenever grants and loyalty did not change in between.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::discount::{DiscountContext, DiscountDecision};
use crate::money::Money;
use crate::types::{new_id, OrderLine, Product};

/// One priced cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineView {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// unit price × quantity
    pub subtotal_before_discount: Money,
    pub discount: Option<DiscountDecision>,
    pub discount_amount: Money,
    pub subtotal_after_discount: Money,
}

impl LineView {
    /// Freezes this line into an order line.
    pub fn to_order_line(&self, order_id: &str) -> OrderLine {
        OrderLine {
            id: new_id(),
            order_id: order_id.to_string(),
            product_id: self.product_id.clone(),
            product_name: self.product_name.clone(),
            unit_price_cents: self.unit_price.cents(),
            quantity: self.quantity,
            discount_percent: self.discount.as_ref().map_or(0, |d| d.percent),
            discount_label: self.discount.as_ref().map(|d| d.label.clone()),
            discount_cents: self.discount_amount.cents(),
            subtotal_cents: self.subtotal_after_discount.cents(),
        }
    }
}

/// A fully priced cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartPricing {
    pub lines: Vec<LineView>,
    pub subtotal_before_discount: Money,
    pub total_discount: Money,
    pub subtotal_after_discount: Money,
}

/// Prices `items` with discounts from `discounts`.
pub fn price_cart(items: &[(Product, i64)], discounts: &DiscountContext<'_>) -> CartPricing {
    price_with(items, |product_id, cart_total| {
        discounts.resolve(product_id, cart_total)
    })
}

/// Prices `items` at list price, no promotions.
pub fn price_at_list(items: &[(Product, i64)]) -> CartPricing {
    price_with(items, |_, _| None)
}

/// Prices `items` using an arbitrary discount lookup.
pub fn price_with<F>(items: &[(Product, i64)], resolve: F) -> CartPricing
where
    F: Fn(&str, Option<Money>) -> Option<DiscountDecision>,
{
    let cart_total: Money = items
        .iter()
        .map(|(product, qty)| product.price().multiply_quantity(*qty))
        .sum();

    let mut pricing = CartPricing::default();

    for (product, quantity) in items {
        let gross = product.price().multiply_quantity(*quantity);
        let discount = resolve(&product.id, Some(cart_total));
        let discount_amount = discount
            .as_ref()
            .map_or(Money::zero(), |d| d.amount_for(gross));

        pricing.subtotal_before_discount += gross;
        pricing.total_discount += discount_amount;

        pricing.lines.push(LineView {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity: *quantity,
            unit_price: product.price(),
            subtotal_before_discount: gross,
            discount,
            discount_amount,
            subtotal_after_discount: gross - discount_amount,
        });
    }

    pricing.subtotal_after_discount = pricing.subtotal_before_discount - pricing.total_discount;
    pricing
}

// =============================================================================
// Unit Tests
// =============================================================================
