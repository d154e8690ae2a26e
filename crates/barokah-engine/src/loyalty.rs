//! # Loyalty Evaluator
//!
//! Store-backed loyalty facts: qualifying spend, loyal status, birthdays in
//! the store calendar and favourite products.
//!
//! The rules themselves live in [`barokah_core::loyalty`]; this module only
//! gathers their inputs.

use chrono::{DateTime, FixedOffset, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::clock::SharedClock;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use barokah_core::loyalty::{is_birthday, is_loyal, rank_top_products, store_date};
use barokah_core::{Customer, LoyaltySnapshot, Money, Product};
use barokah_db::{Database, OrderRepository, ProductRepository};

#[derive(Debug, Clone)]
pub struct LoyaltyEvaluator {
    db: Database,
    clock: SharedClock,
    threshold: Money,
    top_products_limit: usize,
    offset: FixedOffset,
}

impl LoyaltyEvaluator {
    pub fn new(db: Database, clock: SharedClock, config: &EngineConfig) -> Self {
        LoyaltyEvaluator {
            db,
            clock,
            threshold: config.loyalty_threshold(),
            top_products_limit: config.loyalty.top_products_limit,
            offset: config.store_offset(),
        }
    }

    /// Sum of totals over PAID, SHIPPED and COMPLETED orders.
    pub async fn qualifying_spend(&self, customer_id: &str) -> EngineResult<Money> {
        let mut conn = self.db.pool().acquire().await?;
        let cents = OrderRepository::qualifying_spend_in(&mut conn, customer_id).await?;
        Ok(Money::from_cents(cents))
    }

    pub async fn is_loyal(&self, customer_id: &str) -> EngineResult<bool> {
        Ok(is_loyal(self.qualifying_spend(customer_id).await?, self.threshold))
    }

    /// Birth month/day matches today's date in the store's time zone.
    pub fn is_birthday_today(&self, customer: &Customer) -> bool {
        self.is_birthday_at(customer, self.clock.now())
    }

    pub fn is_birthday_at(&self, customer: &Customer, now: DateTime<Utc>) -> bool {
        is_birthday(customer.birth_date, store_date(now, self.offset))
    }

    /// Most purchased products, by quantity over qualifying orders.
    pub async fn top_purchased_products(&self, customer_id: &str, limit: usize) -> EngineResult<Vec<Product>> {
        let mut conn = self.db.pool().acquire().await?;
        let ids = Self::top_product_ids_in(&mut conn, customer_id, limit).await?;
        Ok(ProductRepository::find_many_in(&mut conn, &ids).await?)
    }

    async fn top_product_ids_in(
        conn: &mut SqliteConnection,
        customer_id: &str,
        limit: usize,
    ) -> EngineResult<Vec<String>> {
        let purchases = OrderRepository::purchased_quantities_in(conn, customer_id).await?;
        Ok(rank_top_products(purchases, limit))
    }

    /// One consistent loyalty view of the customer, read from the pool.
    pub async fn snapshot(&self, customer: &Customer) -> EngineResult<LoyaltySnapshot> {
        let mut conn = self.db.pool().acquire().await?;
        self.snapshot_in(&mut conn, customer, self.clock.now()).await
    }

    /// One consistent loyalty view of the customer on a caller-held
    /// connection at instant `now`.
    ///
    /// Top products are only looked up when they can matter (birthday and
    /// loyal), which keeps ordinary checkouts to one aggregate query.
    pub async fn snapshot_in(
        &self,
        conn: &mut SqliteConnection,
        customer: &Customer,
        now: DateTime<Utc>,
    ) -> EngineResult<LoyaltySnapshot> {
        let spend = Money::from_cents(OrderRepository::qualifying_spend_in(conn, &customer.id).await?);
        let loyal = is_loyal(spend, self.threshold);
        let birthday = self.is_birthday_at(customer, now);

        let top_products = if birthday && loyal {
            Self::top_product_ids_in(conn, &customer.id, self.top_products_limit).await?
        } else {
            Vec::new()
        };

        debug!(
            customer_id = %customer.id,
            spend = %spend,
            loyal,
            birthday,
            top = top_products.len(),
            "Loyalty snapshot"
        );

        Ok(LoyaltySnapshot {
            customer_id: customer.id.clone(),
            qualifying_spend: spend,
            is_loyal: loyal,
            is_birthday_today: birthday,
            top_products,
        })
    }

    pub fn top_products_limit(&self) -> usize {
        self.top_products_limit
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}
