//! # Pricing Calculator
//!
//! Store-backed cart pricing. Loads products and discount inputs, then
//! hands off to [`barokah_core::pricing::price_cart`].
//!
//! The storefront preview calls [`PricingCalculator::price`]; order
//! submission calls [`PricingCalculator::price_in`] inside its transaction,
//! so both see the same rules.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::clock::SharedClock;
use crate::discounts::DiscountResolver;
use crate::error::{EngineError, EngineResult};
use barokah_core::pricing::price_cart;
use barokah_core::validation::normalize_cart;
use barokah_core::{CartLine, CartPricing, CoreError, Customer, Product};
use barokah_db::{CustomerRepository, Database, ProductRepository};

/// A priced cart together with the product rows it was priced from.
#[derive(Debug, Clone)]
pub struct PricedCart {
    pub pricing: CartPricing,
    /// Products paired with merged quantities, in cart order.
    pub items: Vec<(Product, i64)>,
}

#[derive(Debug, Clone)]
pub struct PricingCalculator {
    db: Database,
    clock: SharedClock,
    resolver: DiscountResolver,
    max_cart_items: usize,
}

impl PricingCalculator {
    pub fn new(db: Database, clock: SharedClock, resolver: DiscountResolver, max_cart_items: usize) -> Self {
        PricingCalculator {
            db,
            clock,
            resolver,
            max_cart_items,
        }
    }

    /// Prices a cart for `customer_id` as of now.
    pub async fn price(&self, customer_id: &str, cart: &[CartLine]) -> EngineResult<CartPricing> {
        let mut conn = self.db.pool().acquire().await?;
        let customer = CustomerRepository::find_in(&mut conn, customer_id)
            .await?
            .ok_or_else(|| EngineError::CustomerNotFound(customer_id.to_string()))?;

        let priced = self.price_in(&mut conn, &customer, cart, self.clock.now()).await?;
        Ok(priced.pricing)
    }

    /// Prices a cart on a caller-held connection.
    ///
    /// Repeated products are merged first. Stock is not checked here; the
    /// ledger debit at submission is the authority on availability.
    pub async fn price_in(
        &self,
        conn: &mut SqliteConnection,
        customer: &Customer,
        cart: &[CartLine],
        now: DateTime<Utc>,
    ) -> EngineResult<PricedCart> {
        let items = self.load_cart_in(conn, cart).await?;
        let inputs = self.resolver.inputs_in(conn, customer, now).await?;
        let pricing = price_cart(&items, &inputs.context());

        Ok(PricedCart { pricing, items })
    }

    /// Validates and merges the cart, then loads every product in it.
    pub async fn load_cart_in(
        &self,
        conn: &mut SqliteConnection,
        cart: &[CartLine],
    ) -> EngineResult<Vec<(Product, i64)>> {
        let lines = normalize_cart(cart)?;
        if lines.len() > self.max_cart_items {
            return Err(CoreError::CartTooLarge {
                max: self.max_cart_items,
            }
            .into());
        }

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = ProductRepository::find_in(conn, &line.product_id)
                .await?
                .ok_or_else(|| EngineError::ProductNotFound(line.product_id.clone()))?;
            items.push((product, line.quantity));
        }

        Ok(items)
    }

    pub fn resolver(&self) -> &DiscountResolver {
        &self.resolver
    }
}
