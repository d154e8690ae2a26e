//! # Product Repository
//!
//! Database operations for products and categories.
//!
//! ## Key Operations
//! - Catalog reads for pricing previews and submission
//! - Admin inserts and edits
//! - Absolute stock edits (restock), distinct from ledger debits/credits
//!
//! Stock movement caused by orders never goes through this repository; see
//! [`crate::ledger`].

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use barokah_core::{Category, Product};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, stock, category_id, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let semen = repo.get_by_id("uuid-here").await?;
/// let previous = repo.set_stock(&semen.id, 500).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_in(&mut conn, id).await
    }

    /// Same as [`get_by_id`](Self::get_by_id) on a caller-held connection,
    /// so a transaction sees its own uncommitted writes.
    pub async fn find_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Fetches several products by id, preserving the order of `ids`.
    ///
    /// Unknown ids are simply absent from the result; the caller decides
    /// whether that is an error.
    pub async fn find_many_in(conn: &mut SqliteConnection, ids: &[String]) -> DbResult<Vec<Product>> {
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(product) = Self::find_in(conn, id).await? {
                products.push(product);
            }
        }
        Ok(products)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price_cents, stock, category_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(&product.category_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Updates catalog fields (name, description, price, category).
    ///
    /// Stock is deliberately not written here; use [`set_stock`](Self::set_stock).
    /// Existing order lines keep their frozen price and name.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                price_cents = ?4,
                category_id = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(&product.category_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Sets the absolute stock level (admin restock / stocktake).
    ///
    /// ## Returns
    /// The stock level before the edit, so the caller can detect a
    /// 0 → positive restock.
    pub async fn set_stock(&self, id: &str, stock: i64) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        let previous: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let previous = previous.ok_or_else(|| DbError::not_found("Product", id))?;

        sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(stock)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(id = %id, previous, stock, "Stock level set");
        Ok(previous)
    }

    /// Gets the total product count.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn insert_category(&self, category: &Category) -> DbResult<()> {
        sqlx::query("INSERT INTO categories (id, name) VALUES (?1, ?2)")
            .bind(&category.id)
            .bind(&category.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(categories)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::test_fixtures::{product, test_db};
    use crate::DbError;
    use barokah_core::{new_id, Category};

    #[tokio::test]
    async fn test_insert_and_get_product() {
        let db = test_db().await;
        let repo = db.products();

        let semen = product("Semen Gresik 50kg", 65_000, 10);
        repo.insert(&semen).await.unwrap();

        let loaded = repo.get_by_id(&semen.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Semen Gresik 50kg");
        assert_eq!(loaded.price_cents, 6_500_000);
        assert_eq!(loaded.stock, 10);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_stock_returns_previous_level() {
        let db = test_db().await;
        let repo = db.products();

        let bata = product("Bata Merah", 800, 0);
        repo.insert(&bata).await.unwrap();

        assert_eq!(repo.set_stock(&bata.id, 2_000).await.unwrap(), 0);
        assert_eq!(repo.set_stock(&bata.id, 1_500).await.unwrap(), 2_000);
        assert_eq!(repo.get_by_id(&bata.id).await.unwrap().unwrap().stock, 1_500);

        let err = repo.set_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_negative_stock_rejected_by_schema() {
        let db = test_db().await;
        let repo = db.products();

        let cat = product("Cat Tembok 5kg", 120_000, 3);
        repo.insert(&cat).await.unwrap();

        let err = repo.set_stock(&cat.id, -1).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
        assert_eq!(repo.get_by_id(&cat.id).await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_price_above_decimal_range_rejected_by_schema() {
        let db = test_db().await;
        let repo = db.products();

        let mut keramik = product("Keramik 40x40", 0, 10);
        keramik.price_cents = 9_999_999_999;
        repo.insert(&keramik).await.unwrap();

        let mut granit = product("Granit 60x60", 0, 10);
        granit.price_cents = 10_000_000_000;
        let err = repo.insert(&granit).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_update_keeps_stock() {
        let db = test_db().await;
        let repo = db.products();

        let mut pasir = product("Pasir 1m3", 250_000, 7);
        repo.insert(&pasir).await.unwrap();

        pasir.price_cents = 27_500_000;
        pasir.stock = 999;
        repo.update(&pasir).await.unwrap();

        let loaded = repo.get_by_id(&pasir.id).await.unwrap().unwrap();
        assert_eq!(loaded.price_cents, 27_500_000);
        assert_eq!(loaded.stock, 7);
    }

    #[tokio::test]
    async fn test_categories() {
        let db = test_db().await;
        let repo = db.products();

        repo.insert_category(&Category { id: new_id(), name: "Semen".into() })
            .await
            .unwrap();
        let dup = repo
            .insert_category(&Category { id: new_id(), name: "Semen".into() })
            .await
            .unwrap_err();
        assert!(matches!(dup, DbError::UniqueViolation { .. }));
        assert_eq!(repo.list_categories().await.unwrap().len(), 1);
    }
}
