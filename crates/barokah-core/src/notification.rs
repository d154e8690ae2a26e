//! # Notification Intents
//!
//! Messages the engine wants delivered to customers. Building an intent is
//! pure; delivering it is somebody else's job, and always happens after the
//! state change it describes has been committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// What kind of event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    OrderCreated,
    OrderShipped,
    OrderCompleted,
    OrderCancelled,
    PaymentExpired,
    BirthdayLoyal,
    BirthdayConditional,
    Restock,
    NewProduct,
}

impl NotificationCategory {
    /// Birthday categories are sent at most once per customer per store day.
    pub fn is_daily(&self) -> bool {
        matches!(
            self,
            NotificationCategory::BirthdayLoyal | NotificationCategory::BirthdayConditional
        )
    }
}

/// A notification waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NotificationIntent {
    pub customer_id: String,
    pub category: NotificationCategory,
    pub message: String,
    /// Where the customer should land when opening the notification.
    pub target_url: Option<String>,
}

/// Storefront path of an order detail page.
pub fn order_url(order_id: &str) -> String {
    format!("/orders/{}", order_id)
}

/// Storefront path of a product page.
pub fn product_url(product_id: &str) -> String {
    format!("/products/{}", product_id)
}

impl NotificationIntent {
    fn new(
        customer_id: &str,
        category: NotificationCategory,
        message: String,
        target_url: Option<String>,
    ) -> Self {
        NotificationIntent {
            customer_id: customer_id.to_string(),
            category,
            message,
            target_url,
        }
    }

    pub fn order_created(customer_id: &str, order_id: &str, deadline: DateTime<Utc>) -> Self {
        Self::new(
            customer_id,
            NotificationCategory::OrderCreated,
            format!(
                "Your order #{} has been created. Please complete payment before {} UTC.",
                order_id,
                deadline.format("%Y-%m-%d %H:%M")
            ),
            Some(order_url(order_id)),
        )
    }

    pub fn order_shipped(customer_id: &str, order_id: &str) -> Self {
        Self::new(
            customer_id,
            NotificationCategory::OrderShipped,
            format!("Your order #{} has been shipped!", order_id),
            Some(order_url(order_id)),
        )
    }

    pub fn order_completed(customer_id: &str, order_id: &str) -> Self {
        Self::new(
            customer_id,
            NotificationCategory::OrderCompleted,
            format!("Order #{} completed. Give your feedback here!", order_id),
            Some(order_url(order_id)),
        )
    }

    pub fn order_cancelled(customer_id: &str, order_id: &str) -> Self {
        Self::new(
            customer_id,
            NotificationCategory::OrderCancelled,
            format!("Order #{} has been cancelled.", order_id),
            Some(order_url(order_id)),
        )
    }

    pub fn payment_expired(customer_id: &str, order_id: &str) -> Self {
        Self::new(
            customer_id,
            NotificationCategory::PaymentExpired,
            format!(
                "Order #{} was cancelled because the payment deadline passed.",
                order_id
            ),
            Some(order_url(order_id)),
        )
    }

    pub fn birthday_loyal(customer_id: &str, percent: u32, product_count: usize) -> Self {
        Self::new(
            customer_id,
            NotificationCategory::BirthdayLoyal,
            format!(
                "Happy birthday! A {}% discount is automatically active today on your {} favourite products.",
                percent, product_count
            ),
            None,
        )
    }

    pub fn birthday_conditional(customer_id: &str, percent: u32, threshold: Money) -> Self {
        Self::new(
            customer_id,
            NotificationCategory::BirthdayConditional,
            format!(
                "Happy birthday! Get {}% off ALL purchases today when your cart reaches {}.",
                percent, threshold
            ),
            None,
        )
    }

    pub fn restock(customer_id: &str, product_id: &str, product_name: &str) -> Self {
        Self::new(
            customer_id,
            NotificationCategory::Restock,
            format!("{} is back in stock!", product_name),
            Some(product_url(product_id)),
        )
    }

    pub fn new_product(customer_id: &str, product_id: &str, product_name: &str) -> Self {
        Self::new(
            customer_id,
            NotificationCategory::NewProduct,
            format!("New product available: {}", product_name),
            Some(product_url(product_id)),
        )
    }
}
