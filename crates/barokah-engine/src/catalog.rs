//! Admin catalog edits that customers get told about: new products and
//! restocks of sold-out products.

use tracing::info;

use crate::clock::SharedClock;
use crate::error::{EngineError, EngineResult};
use crate::notifier::{deliver_all, SharedSink};
use barokah_core::validation::{validate_price_cents, validate_product_name, validate_stock};
use barokah_core::{new_id, Money, NotificationIntent, Product};
use barokah_db::{Database, DbError};

/// A product as entered on the admin form.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub category_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
    clock: SharedClock,
    sink: SharedSink,
}

impl CatalogService {
    pub fn new(db: Database, clock: SharedClock, sink: SharedSink) -> Self {
        CatalogService { db, clock, sink }
    }

    /// Adds a product and announces it to every customer.
    pub async fn create_product(&self, new: NewProduct) -> EngineResult<Product> {
        validate_product_name(&new.name)?;
        validate_price_cents("price", new.price.cents())?;
        validate_stock(new.stock)?;

        let now = self.clock.now();
        let product = Product {
            id: new_id(),
            name: new.name.trim().to_string(),
            description: new.description,
            price_cents: new.price.cents(),
            stock: new.stock,
            category_id: new.category_id,
            created_at: now,
            updated_at: now,
        };
        let product = self.db.products().insert(&product).await?;
        info!(product_id = %product.id, name = %product.name, "Product created");

        self.announce(|customer_id| NotificationIntent::new_product(customer_id, &product.id, &product.name))
            .await?;

        Ok(product)
    }

    /// Sets the absolute stock level of a product.
    ///
    /// When a sold-out product comes back (0 → positive), every customer is
    /// told.
    ///
    /// ## Returns
    /// The stock level before the edit.
    pub async fn restock_product(&self, product_id: &str, stock: i64) -> EngineResult<i64> {
        validate_stock(stock)?;

        let previous = self
            .db
            .products()
            .set_stock(product_id, stock)
            .await
            .map_err(|e| match e {
                DbError::NotFound { .. } => EngineError::ProductNotFound(product_id.to_string()),
                other => other.into(),
            })?;

        info!(product_id = %product_id, previous, stock, "Stock level set");

        if previous == 0 && stock > 0 {
            let product = self
                .db
                .products()
                .get_by_id(product_id)
                .await?
                .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))?;

            self.announce(|customer_id| NotificationIntent::restock(customer_id, &product.id, &product.name))
                .await?;
        }

        Ok(previous)
    }

    /// Sends one intent per customer.
    async fn announce<F>(&self, intent_for: F) -> EngineResult<usize>
    where
        F: Fn(&str) -> NotificationIntent,
    {
        let customer_ids = self.db.customers().list_ids().await?;
        let intents: Vec<NotificationIntent> = customer_ids.iter().map(|id| intent_for(id.as_str())).collect();

        let delivered = deliver_all(self.sink.as_ref(), &intents).await;
        info!(recipients = intents.len(), delivered, "Catalog announcement sent");
        Ok(delivered)
    }
}
