//! # Discount Resolver
//!
//! Loads a customer's grants and loyalty snapshot, then asks
//! [`DiscountContext::resolve`] which single discount applies.
//!
//! ```text
//!   resolve(customer, product, cart_total)
//!        │
//!        ├── CustomerRepository::find_in     (404 → CustomerNotFound)
//!        ├── DiscountRepository::list_for_customer_in
//!        ├── LoyaltyEvaluator::snapshot_in
//!        ▼
//!   ResolutionInputs ──context()──► DiscountContext::resolve (pure)
//! ```
//!
//! Pricing and submission build [`ResolutionInputs`] once per cart so every
//! line sees the same grants and the same loyalty facts.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::clock::SharedClock;
use crate::error::{EngineError, EngineResult};
use crate::loyalty::LoyaltyEvaluator;
use barokah_core::discount::DiscountContext;
use barokah_core::{Customer, DiscountDecision, DiscountGrant, LoyaltySnapshot, Money, PromotionPolicy};
use barokah_db::{CustomerRepository, Database, DiscountRepository};

/// Everything one resolve pass needs, owned.
#[derive(Debug, Clone)]
pub struct ResolutionInputs {
    pub grants: Vec<DiscountGrant>,
    pub loyalty: LoyaltySnapshot,
    pub policy: PromotionPolicy,
    pub now: DateTime<Utc>,
}

impl ResolutionInputs {
    pub fn context(&self) -> DiscountContext<'_> {
        DiscountContext {
            grants: &self.grants,
            loyalty: &self.loyalty,
            policy: &self.policy,
            now: self.now,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscountResolver {
    db: Database,
    clock: SharedClock,
    loyalty: LoyaltyEvaluator,
    policy: PromotionPolicy,
}

impl DiscountResolver {
    pub fn new(db: Database, clock: SharedClock, loyalty: LoyaltyEvaluator, policy: PromotionPolicy) -> Self {
        DiscountResolver {
            db,
            clock,
            loyalty,
            policy,
        }
    }

    /// The discount for one product, or `None`.
    ///
    /// `cart_total` is the pre-discount cart total; `None` skips the
    /// conditional birthday rule.
    pub async fn resolve(
        &self,
        customer_id: &str,
        product_id: &str,
        cart_total: Option<Money>,
    ) -> EngineResult<Option<DiscountDecision>> {
        let mut conn = self.db.pool().acquire().await?;
        let customer = CustomerRepository::find_in(&mut conn, customer_id)
            .await?
            .ok_or_else(|| EngineError::CustomerNotFound(customer_id.to_string()))?;

        let inputs = self.inputs_in(&mut conn, &customer, self.clock.now()).await?;
        Ok(inputs.context().resolve(product_id, cart_total))
    }

    /// Reads grants and loyalty facts on a caller-held connection.
    pub async fn inputs_in(
        &self,
        conn: &mut SqliteConnection,
        customer: &Customer,
        now: DateTime<Utc>,
    ) -> EngineResult<ResolutionInputs> {
        let grants = DiscountRepository::list_for_customer_in(conn, &customer.id).await?;
        let loyalty = self.loyalty.snapshot_in(conn, customer, now).await?;

        Ok(ResolutionInputs {
            grants,
            loyalty,
            policy: self.policy,
            now,
        })
    }

    pub fn policy(&self) -> &PromotionPolicy {
        &self.policy
    }

    pub fn loyalty(&self) -> &LoyaltyEvaluator {
        &self.loyalty
    }
}
