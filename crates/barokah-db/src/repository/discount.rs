//! # Discount Grant Repository
//!
//! Admin CRUD over discount grants plus the idempotent insert used by the
//! birthday sweep.
//!
//! ## Grant Sources
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────────┐
//! │ ADMIN            │ insert / update / deactivate / delete by admins  │
//! │ BIRTHDAY_RULE    │ insert_birthday_grant() from the daily sweep,    │
//! │                  │ one per (customer, product, expiry)              │
//! └──────────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! Expiry is not filtered in SQL; [`DiscountGrant::is_effective`] decides,
//! so the rule lives in exactly one place.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use barokah_core::validation::validate_percent;
use barokah_core::{DiscountGrant, GrantSource, GrantStatus};

const GRANT_COLUMNS: &str =
    "id, customer_id, product_id, percent, status, source, message, expires_at, created_at";

/// Repository for discount grants.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DiscountGrant>> {
        let sql = format!("SELECT {} FROM discount_grants WHERE id = ?1", GRANT_COLUMNS);
        let grant = sqlx::query_as::<_, DiscountGrant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(grant)
    }

    /// Every grant of a customer, any status.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<DiscountGrant>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_for_customer_in(&mut conn, customer_id).await
    }

    /// Every grant of a customer on a caller-held connection, so submission
    /// resolves against the grant state inside its own transaction.
    pub async fn list_for_customer_in(
        conn: &mut SqliteConnection,
        customer_id: &str,
    ) -> DbResult<Vec<DiscountGrant>> {
        let sql = format!(
            "SELECT {} FROM discount_grants WHERE customer_id = ?1 ORDER BY created_at, id",
            GRANT_COLUMNS
        );
        let grants = sqlx::query_as::<_, DiscountGrant>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(grants)
    }

    pub async fn insert(&self, grant: &DiscountGrant) -> DbResult<()> {
        validate_percent(grant.percent)?;

        debug!(
            id = %grant.id,
            customer_id = %grant.customer_id,
            product_id = ?grant.product_id,
            percent = grant.percent,
            "Inserting discount grant"
        );

        sqlx::query(
            r#"
            INSERT INTO discount_grants (
                id, customer_id, product_id, percent, status, source, message,
                expires_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&grant.id)
        .bind(&grant.customer_id)
        .bind(&grant.product_id)
        .bind(grant.percent)
        .bind(grant.status)
        .bind(grant.source)
        .bind(&grant.message)
        .bind(grant.expires_at)
        .bind(grant.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a birthday-rule grant unless the same (customer, product,
    /// expiry) grant already exists.
    ///
    /// ## Returns
    /// `true` if a row was written, `false` on a same-day re-run.
    pub async fn insert_birthday_grant(&self, grant: &DiscountGrant) -> DbResult<bool> {
        debug_assert_eq!(grant.source, GrantSource::BirthdayRule);

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO discount_grants (
                id, customer_id, product_id, percent, status, source, message,
                expires_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&grant.id)
        .bind(&grant.customer_id)
        .bind(&grant.product_id)
        .bind(grant.percent)
        .bind(grant.status)
        .bind(GrantSource::BirthdayRule)
        .bind(&grant.message)
        .bind(grant.expires_at)
        .bind(grant.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Updates scope, percent, status, message and expiry of a grant.
    pub async fn update(&self, grant: &DiscountGrant) -> DbResult<()> {
        validate_percent(grant.percent)?;

        let result = sqlx::query(
            r#"
            UPDATE discount_grants SET
                product_id = ?2,
                percent = ?3,
                status = ?4,
                message = ?5,
                expires_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&grant.id)
        .bind(&grant.product_id)
        .bind(grant.percent)
        .bind(grant.status)
        .bind(&grant.message)
        .bind(grant.expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DiscountGrant", &grant.id));
        }

        Ok(())
    }

    /// Marks a grant INACTIVE without deleting it.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE discount_grants SET status = ?2 WHERE id = ?1")
            .bind(id)
            .bind(GrantStatus::Inactive)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DiscountGrant", id));
        }

        debug!(id = %id, "Discount grant deactivated");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM discount_grants WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DiscountGrant", id));
        }

        Ok(())
    }
}
