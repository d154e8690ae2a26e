//! # Inventory Ledger
//!
//! Stock debits and credits caused by orders.
//!
//! ## Compare-and-Set Debit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE products                                                        │
//! │  SET stock = stock - :qty                                              │
//! │  WHERE id = :product AND stock >= :qty                                 │
//! │                                                                         │
//! │  1 row  → debited                                                      │
//! │  0 rows → look the product up:                                         │
//! │             missing  → ProductNotFound                                 │
//! │             present  → InsufficientStock { available, requested }      │
//! │                                                                         │
//! │  The check and the write are one statement, so two concurrent          │
//! │  checkouts can never both pass against the same last units.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ledger calls never open their own transaction or read the clock. Callers run every debit of
//! one order on the same transaction, so a failed debit rolls back the ones
//! before it.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

/// Stateless namespace for ledger operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryLedger;

impl InventoryLedger {
    /// Removes `quantity` units of a product, or nothing at all.
    pub async fn debit(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        debug!(product_id = %product_id, quantity, "Ledger debit");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let row: Option<(String, i64)> = sqlx::query_as("SELECT name, stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some((product_name, available)) => Err(LedgerError::InsufficientStock {
                product_id: product_id.to_string(),
                product_name,
                available,
                requested: quantity,
            }),
            None => Err(LedgerError::ProductNotFound(product_id.to_string())),
        }
    }

    /// Returns `quantity` units of a product to stock.
    ///
    /// Never fails on stock grounds. Crediting more than was debited is a
    /// caller bug and is not guarded here.
    pub async fn credit(
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        debug!(product_id = %product_id, quantity, "Ledger credit");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::ProductNotFound(product_id.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{fixed_now, product, test_db};

    #[tokio::test]
    async fn test_debit_and_credit() {
        let db = test_db().await;
        let semen = product("Semen 50kg", 65_000, 10);
        db.products().insert(&semen).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        InventoryLedger::debit(&mut tx, &semen.id, 4, fixed_now()).await.unwrap();
        InventoryLedger::credit(&mut tx, &semen.id, 1, fixed_now()).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(db.products().get_by_id(&semen.id).await.unwrap().unwrap().stock, 7);
    }

    #[tokio::test]
    async fn test_movements_stamp_the_callers_time() {
        let db = test_db().await;
        let semen = product("Semen 50kg", 65_000, 10);
        db.products().insert(&semen).await.unwrap();

        let debited_at = fixed_now() + chrono::Duration::hours(3);
        let mut tx = db.begin().await.unwrap();
        InventoryLedger::debit(&mut tx, &semen.id, 2, debited_at).await.unwrap();
        tx.commit().await.unwrap();
        let stored = db.products().get_by_id(&semen.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, debited_at);

        let credited_at = debited_at + chrono::Duration::days(1);
        let mut tx = db.begin().await.unwrap();
        InventoryLedger::credit(&mut tx, &semen.id, 2, credited_at).await.unwrap();
        tx.commit().await.unwrap();
        let stored = db.products().get_by_id(&semen.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, credited_at);
        assert_eq!(stored.stock, 10);
    }

    #[tokio::test]
    async fn test_debit_exact_stock_reaches_zero() {
        let db = test_db().await;
        let bata = product("Bata Merah", 800, 500);
        db.products().insert(&bata).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        InventoryLedger::debit(&mut tx, &bata.id, 500, fixed_now()).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(db.products().get_by_id(&bata.id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_changes_nothing() {
        let db = test_db().await;
        let semen = product("Semen 50kg", 65_000, 3);
        db.products().insert(&semen).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let err = InventoryLedger::debit(&mut tx, &semen.id, 4, fixed_now()).await.unwrap_err();
        match err {
            LedgerError::InsufficientStock {
                product_name,
                available,
                requested,
                ..
            } => {
                assert_eq!(product_name, "Semen 50kg");
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        tx.commit().await.unwrap();

        assert_eq!(db.products().get_by_id(&semen.id).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_failed_debit_rolls_back_earlier_debits() {
        let db = test_db().await;
        let semen = product("Semen 50kg", 65_000, 10);
        let pasir = product("Pasir 1m3", 250_000, 1);
        db.products().insert(&semen).await.unwrap();
        db.products().insert(&pasir).await.unwrap();

        {
            let mut tx = db.begin().await.unwrap();
            InventoryLedger::debit(&mut tx, &semen.id, 5, fixed_now()).await.unwrap();
            assert!(InventoryLedger::debit(&mut tx, &pasir.id, 2, fixed_now()).await.is_err());
            // dropped: rollback
        }

        assert_eq!(db.products().get_by_id(&semen.id).await.unwrap().unwrap().stock, 10);
        assert_eq!(db.products().get_by_id(&pasir.id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let db = test_db().await;
        let mut tx = db.begin().await.unwrap();

        assert!(matches!(
            InventoryLedger::debit(&mut tx, "missing", 1, fixed_now()).await,
            Err(LedgerError::ProductNotFound(_))
        ));
        assert!(matches!(
            InventoryLedger::credit(&mut tx, "missing", 1, fixed_now()).await,
            Err(LedgerError::ProductNotFound(_))
        ));
    }
}
