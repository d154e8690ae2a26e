//! # Customer Repository
//!
//! Customer records. Loyalty spend is not stored on the customer; see
//! [`OrderRepository::qualifying_spend_in`](crate::repository::order::OrderRepository::qualifying_spend_in).

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use barokah_core::Customer;

const CUSTOMER_COLUMNS: &str = "id, name, username, address, phone, birth_date, created_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, username = %customer.username, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, username, address, phone, birth_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.username)
        .bind(&customer.address)
        .bind(&customer.phone)
        .bind(customer.birth_date)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_in(&mut conn, id).await
    }

    /// Loads a customer on a caller-held connection.
    pub async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("SELECT {} FROM customers WHERE id = ?1", CUSTOMER_COLUMNS);
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(customer)
    }

    /// Lists every customer, oldest first.
    ///
    /// Used by the birthday sweep, which filters by month/day in Rust so the
    /// Feb-29 rule stays in one place.
    pub async fn list_all(&self) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {} FROM customers ORDER BY created_at, id",
            CUSTOMER_COLUMNS
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(customers)
    }

    /// IDs of every customer, for broadcast notifications (restock, new product).
    pub async fn list_ids(&self) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM customers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}
