//! # barokah-engine: Order Lifecycle & Promotion Services
//!
//! Runs the rules of `barokah-core` against the store in `barokah-db`. Every
//! state-changing operation is one transaction; notifications go out only
//! after it commits.
//!
//! ## Service Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Engine                                     │
//! │                                                                         │
//! │   LoyaltyEvaluator ──► DiscountResolver ──► PricingCalculator           │
//! │          │                                        │                     │
//! │          │                                        ▼                     │
//! │          └──────────► BirthdaySweep        OrderStateMachine            │
//! │                             │                     │                     │
//! │   CatalogService            │                     │                     │
//! │          │                  ▼                     ▼                     │
//! │          └─────────► NotificationSink ◄───────────┘                     │
//! │                                                                         │
//! │   Clock (SystemClock | FixedClock) is shared by every service           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use barokah_core::CartLine;
//! use barokah_engine::{Engine, EngineConfig, MemoryNotificationSink, SystemClock};
//! use barokah_db::{Database, DbConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DbConfig::in_memory()).await?;
//! let engine = Engine::new(
//!     db,
//!     Arc::new(SystemClock),
//!     Arc::new(MemoryNotificationSink::new()),
//!     EngineConfig::default(),
//! );
//!
//! let cart = vec![CartLine::new("product-id", 10)];
//! let preview = engine.pricing().price("customer-id", &cart).await?;
//! println!("You pay {}", preview.subtotal_after_discount);
//!
//! let order_id = engine.orders().submit("customer-id", &cart, "", None).await?;
//! println!("Order {} created", order_id);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod birthday;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod discounts;
pub mod error;
pub mod loyalty;
pub mod notifier;
pub mod orders;
pub mod pricing;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use birthday::{BirthdaySweep, SweepReport};
pub use catalog::{CatalogService, NewProduct};
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use config::EngineConfig;
pub use discounts::{DiscountResolver, ResolutionInputs};
pub use error::{
    ConfigError, ConfigResult, EditError, EngineError, EngineResult, FeedbackError, NotifyError,
    SubmissionError, TransitionError,
};
pub use loyalty::LoyaltyEvaluator;
pub use notifier::{
    deliver_all, MemoryNotificationSink, NotificationSink, OutboxNotificationSink, SharedSink,
};
pub use orders::{AdminOrderRequest, OrderStateMachine};
pub use pricing::{PricedCart, PricingCalculator};

use barokah_db::Database;

// =============================================================================
// Engine
// =============================================================================

/// All services wired against one database, clock and notification sink.
#[derive(Debug, Clone)]
pub struct Engine {
    db: Database,
    config: EngineConfig,
    loyalty: LoyaltyEvaluator,
    resolver: DiscountResolver,
    pricing: PricingCalculator,
    orders: OrderStateMachine,
    birthday: BirthdaySweep,
    catalog: CatalogService,
}

impl Engine {
    pub fn new(db: Database, clock: SharedClock, sink: SharedSink, config: EngineConfig) -> Self {
        let policy = config.promotion_policy();

        let loyalty = LoyaltyEvaluator::new(db.clone(), clock.clone(), &config);
        let resolver = DiscountResolver::new(db.clone(), clock.clone(), loyalty.clone(), policy);
        let pricing = PricingCalculator::new(
            db.clone(),
            clock.clone(),
            resolver.clone(),
            config.orders.max_cart_items,
        );
        let orders = OrderStateMachine::new(db.clone(), clock.clone(), pricing.clone(), sink.clone(), &config);
        let birthday = BirthdaySweep::new(db.clone(), clock.clone(), loyalty.clone(), sink.clone(), policy);
        let catalog = CatalogService::new(db.clone(), clock, sink);

        Engine {
            db,
            config,
            loyalty,
            resolver,
            pricing,
            orders,
            birthday,
            catalog,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn loyalty(&self) -> &LoyaltyEvaluator {
        &self.loyalty
    }

    pub fn resolver(&self) -> &DiscountResolver {
        &self.resolver
    }

    pub fn pricing(&self) -> &PricingCalculator {
        &self.pricing
    }

    pub fn orders(&self) -> &OrderStateMachine {
        &self.orders
    }

    pub fn birthday(&self) -> &BirthdaySweep {
        &self.birthday
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }
}
