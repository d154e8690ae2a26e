//! # Notification Outbox Repository
//!
//! Stores notification intents for an external delivery worker.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Notification Outbox                                  │
//! │                                                                         │
//! │  Engine commits a state change (order shipped, birthday sweep, ...)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  enqueue(intent, dedupe_day)                                           │
//! │     INSERT OR IGNORE INTO notifications ...                            │
//! │     (customer, category, dedupe_day) unique when dedupe_day is set     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            DELIVERY WORKER (external)                           │   │
//! │  │                                                                 │   │
//! │  │  1. pending(limit)      WHERE delivered_at IS NULL              │   │
//! │  │  2. mark_delivered(id)  on success                              │   │
//! │  │  3. mark_failed(id, e)  attempts += 1, last_error = e           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use barokah_core::{new_id, NotificationCategory, NotificationIntent};

/// A notification row as stored in the outbox.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredNotification {
    pub id: String,
    pub customer_id: String,
    pub category: NotificationCategory,
    pub message: String,
    pub target_url: Option<String>,
    pub dedupe_day: Option<NaiveDate>,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Repository for the notification outbox.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Queues an intent for delivery.
    ///
    /// With `dedupe_day` set, a second intent of the same category for the
    /// same customer on the same day is silently dropped.
    ///
    /// ## Returns
    /// `true` if a row was written.
    pub async fn enqueue(
        &self,
        intent: &NotificationIntent,
        dedupe_day: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO notifications (
                id, customer_id, category, message, target_url, dedupe_day,
                attempts, last_error, created_at, delivered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7, NULL)
            "#,
        )
        .bind(new_id())
        .bind(&intent.customer_id)
        .bind(intent.category)
        .bind(&intent.message)
        .bind(&intent.target_url)
        .bind(dedupe_day)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let written = result.rows_affected() == 1;
        debug!(
            customer_id = %intent.customer_id,
            category = ?intent.category,
            written,
            "Notification enqueued"
        );
        Ok(written)
    }

    /// Undelivered notifications, oldest first.
    pub async fn pending(&self, limit: u32) -> DbResult<Vec<StoredNotification>> {
        let rows = sqlx::query_as::<_, StoredNotification>(
            r#"
            SELECT id, customer_id, category, message, target_url, dedupe_day,
                   attempts, last_error, created_at, delivered_at
            FROM notifications
            WHERE delivered_at IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Every notification of a customer, oldest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<StoredNotification>> {
        let rows = sqlx::query_as::<_, StoredNotification>(
            r#"
            SELECT id, customer_id, category, message, target_url, dedupe_day,
                   attempts, last_error, created_at, delivered_at
            FROM notifications
            WHERE customer_id = ?1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn mark_delivered(&self, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE notifications SET delivered_at = ?2, attempts = attempts + 1 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        sqlx::query("UPDATE notifications SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1")
            .bind(id)
            .bind(error)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE delivered_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
