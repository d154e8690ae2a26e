//! # Order Repository
//!
//! Database operations for orders and order lines.
//!
//! ## Order Lifecycle (storage view)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. INSERT                                                             │
//! │     └── insert_in() → order row + frozen lines, same transaction       │
//! │         as the ledger debits                                           │
//! │                                                                         │
//! │  2. STATUS CHANGES                                                     │
//! │     └── update_status_in(id, expected, next)                           │
//! │         UPDATE ... WHERE id = ? AND status = expected                  │
//! │         0 rows → someone else moved the order first                    │
//! │                                                                         │
//! │  3. ADMIN EDITS                                                        │
//! │     └── update_line_in() + update_totals_in(), same transaction        │
//! │                                                                         │
//! │  4. FEEDBACK                                                           │
//! │     └── set_feedback_in() only while COMPLETED                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Functions suffixed `_in` run on a caller-held connection, normally
//! `&mut *tx` of the engine's unit of work.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use barokah_core::{Order, OrderLine, OrderStatus};

const ORDER_COLUMNS: &str = "id, customer_id, status, shipping_address, shipping_fee_cents, \
     total_cents, payment_deadline, proof_artifact, feedback, feedback_photo, stock_committed, \
     created_at, updated_at";

const LINE_COLUMNS: &str = "id, order_id, product_id, product_name, unit_price_cents, quantity, \
     discount_percent, discount_label, discount_cents, subtotal_cents";

/// `('PAID', 'SHIPPED', 'COMPLETED')`, built from the lifecycle rules.
fn purchase_statuses() -> String {
    let quoted: Vec<String> = OrderStatus::ALL
        .iter()
        .filter(|s| s.counts_as_purchase())
        .map(|s| format!("'{}'", s.as_str()))
        .collect();
    format!("({})", quoted.join(", "))
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_in(&mut conn, id).await
    }

    pub async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLUMNS);
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(order)
    }

    /// Gets the lines of an order in submission order.
    pub async fn get_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let mut conn = self.pool.acquire().await?;
        Self::lines_in(&mut conn, order_id).await
    }

    pub async fn lines_in(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let sql = format!(
            "SELECT {} FROM order_lines WHERE order_id = ?1 ORDER BY position, id",
            LINE_COLUMNS
        );
        let lines = sqlx::query_as::<_, OrderLine>(&sql)
            .bind(order_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(lines)
    }

    /// Lists orders in a given status, oldest first.
    pub async fn list_by_status(&self, status: OrderStatus) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE status = ?1 ORDER BY created_at, id",
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Lists a customer's orders, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE customer_id = ?1 ORDER BY created_at DESC, id",
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Sum of `total_cents` over the customer's PAID, SHIPPED and COMPLETED orders.
    pub async fn qualifying_spend_in(conn: &mut SqliteConnection, customer_id: &str) -> DbResult<i64> {
        let sql = format!(
            "SELECT COALESCE(SUM(total_cents), 0) FROM orders WHERE customer_id = ?1 AND status IN {}",
            purchase_statuses()
        );
        let spend: i64 = sqlx::query_scalar(&sql)
            .bind(customer_id)
            .fetch_one(&mut *conn)
            .await?;

        Ok(spend)
    }

    /// Total purchased quantity per product over the customer's qualifying orders.
    ///
    /// Unordered; ranking lives in `barokah_core::loyalty::rank_top_products`.
    pub async fn purchased_quantities_in(
        conn: &mut SqliteConnection,
        customer_id: &str,
    ) -> DbResult<Vec<(String, i64)>> {
        let sql = format!(
            r#"
            SELECT l.product_id, SUM(l.quantity)
            FROM order_lines l
            INNER JOIN orders o ON o.id = l.order_id
            WHERE o.customer_id = ?1 AND o.status IN {}
            GROUP BY l.product_id
            "#,
            purchase_statuses()
        );
        let rows = sqlx::query_as::<_, (String, i64)>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows)
    }

    // =========================================================================
    // Writes (transaction-scoped)
    // =========================================================================

    /// Inserts an order together with its lines.
    pub async fn insert_in(conn: &mut SqliteConnection, order: &Order, lines: &[OrderLine]) -> DbResult<()> {
        debug!(id = %order.id, status = %order.status, lines = lines.len(), "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, status, shipping_address, shipping_fee_cents,
                total_cents, payment_deadline, proof_artifact, feedback, feedback_photo,
                stock_committed, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_id)
        .bind(order.status)
        .bind(&order.shipping_address)
        .bind(order.shipping_fee_cents)
        .bind(order.total_cents)
        .bind(order.payment_deadline)
        .bind(&order.proof_artifact)
        .bind(&order.feedback)
        .bind(&order.feedback_photo)
        .bind(order.stock_committed)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;

        for (position, line) in lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    id, order_id, product_id, product_name, unit_price_cents, quantity,
                    discount_percent, discount_label, discount_cents, subtotal_cents, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&line.id)
            .bind(&line.order_id)
            .bind(&line.product_id)
            .bind(&line.product_name)
            .bind(line.unit_price_cents)
            .bind(line.quantity)
            .bind(line.discount_percent)
            .bind(&line.discount_label)
            .bind(line.discount_cents)
            .bind(line.subtotal_cents)
            .bind(position as i64)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Compare-and-set status write.
    ///
    /// ## Returns
    /// `true` when the row was still in `expected` and is now in `next`;
    /// `false` when another writer got there first (nothing written).
    pub async fn update_status_in(
        conn: &mut SqliteConnection,
        id: &str,
        expected: OrderStatus,
        next: OrderStatus,
        stock_committed: bool,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?3, stock_committed = ?4, updated_at = ?5
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .bind(stock_committed)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        debug!(id = %id, %expected, %next, applied = result.rows_affected() == 1, "Order status CAS");
        Ok(result.rows_affected() == 1)
    }

    /// Stores feedback if and only if the order is COMPLETED.
    ///
    /// Returns `false` when the order is missing or not completed.
    pub async fn set_feedback_in(
        conn: &mut SqliteConnection,
        id: &str,
        feedback: &str,
        photo: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET feedback = ?2, feedback_photo = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?5
            "#,
        )
        .bind(id)
        .bind(feedback)
        .bind(photo)
        .bind(now)
        .bind(OrderStatus::Completed)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Writes a re-derived line (quantity, discount amount, subtotal).
    pub async fn update_line_in(conn: &mut SqliteConnection, line: &OrderLine) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE order_lines
            SET quantity = ?2, discount_cents = ?3, subtotal_cents = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&line.id)
        .bind(line.quantity)
        .bind(line.discount_cents)
        .bind(line.subtotal_cents)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Writes the shipping fee and the recomputed total.
    pub async fn update_totals_in(
        conn: &mut SqliteConnection,
        id: &str,
        shipping_fee_cents: i64,
        total_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET shipping_fee_cents = ?2, total_cents = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(shipping_fee_cents)
        .bind(total_cents)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
