//! Shared fixtures for the engine's store-backed tests.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use std::path::Path;
use std::sync::Arc;

use crate::birthday::BirthdaySweep;
use crate::catalog::CatalogService;
use crate::clock::{Clock, FixedClock};
use crate::config::EngineConfig;
use crate::discounts::DiscountResolver;
use crate::error::NotifyError;
use crate::loyalty::LoyaltyEvaluator;
use crate::notifier::{MemoryNotificationSink, NotificationSink};
use crate::orders::OrderStateMachine;
use crate::pricing::PricingCalculator;
use crate::Engine;
use barokah_core::loyalty::store_date;
use barokah_core::{
    new_id, Customer, DiscountGrant, GrantSource, GrantStatus, Money, NotificationIntent, Order, OrderLine,
    OrderStatus, Product,
};
use barokah_db::{Database, DbConfig, OrderRepository};

/// Monday 10 June 2024, 10:00 in Jakarta.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 3, 0, 0).unwrap()
}

pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Every service wired against one in-memory database, a settable clock
/// and an in-memory sink.
pub struct Harness {
    pub db: Database,
    pub clock: Arc<FixedClock>,
    pub sink: Arc<MemoryNotificationSink>,
    pub config: EngineConfig,
    pub loyalty: LoyaltyEvaluator,
    pub resolver: DiscountResolver,
    pub pricing: PricingCalculator,
    pub orders: OrderStateMachine,
    pub birthday: BirthdaySweep,
    pub catalog: CatalogService,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(EngineConfig::default()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        Self::with_db(test_db().await, config)
    }

    /// A harness on a SQLite file with a real multi-connection pool, for
    /// tests where several units of work run at the same time.
    pub async fn on_file(dir: &Path) -> Self {
        let db = Database::new(DbConfig::new(dir.join("barokah.db")).max_connections(8))
            .await
            .unwrap();
        Self::with_db(db, EngineConfig::default())
    }

    fn with_db(db: Database, config: EngineConfig) -> Self {
        let clock = Arc::new(FixedClock::new(fixed_now()));
        let sink = Arc::new(MemoryNotificationSink::new());
        let engine = Engine::new(db.clone(), clock.clone(), sink.clone(), config.clone());

        Harness {
            db,
            clock,
            sink,
            config,
            loyalty: engine.loyalty().clone(),
            resolver: engine.resolver().clone(),
            pricing: engine.pricing().clone(),
            orders: engine.orders().clone(),
            birthday: engine.birthday().clone(),
            catalog: engine.catalog().clone(),
        }
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// A birth date that falls on the harness clock's store day.
pub fn today_birthday(h: &Harness) -> NaiveDate {
    let today = store_date(h.clock_now(), h.config.store_offset());
    NaiveDate::from_ymd_opt(1990, today.month(), today.day()).unwrap()
}

/// A birth date far from the harness clock's store day.
pub fn not_today_birthday() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()
}

pub async fn insert_customer(db: &Database, username: &str, birth_date: NaiveDate) -> Customer {
    let customer = Customer {
        id: new_id(),
        name: username.to_uppercase(),
        username: username.to_string(),
        address: format!("Jl. {} No. 1, Sleman", username),
        phone: Some("0812-0000-0000".to_string()),
        birth_date,
        created_at: fixed_now(),
    };
    db.customers().insert(&customer).await.unwrap();
    customer
}

pub async fn insert_product(db: &Database, name: &str, price_major: i64, stock: i64) -> Product {
    insert_product_with_id(db, &new_id(), name, price_major, stock).await
}

pub async fn insert_product_with_id(
    db: &Database,
    id: &str,
    name: &str,
    price_major: i64,
    stock: i64,
) -> Product {
    let product = Product {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        price_cents: Money::from_major(price_major).cents(),
        stock,
        category_id: None,
        created_at: fixed_now(),
        updated_at: fixed_now(),
    };
    db.products().insert(&product).await.unwrap()
}

/// Writes an order at list price straight to the store, without moving stock.
pub async fn insert_order(
    db: &Database,
    customer_id: &str,
    status: OrderStatus,
    items: &[(&Product, i64)],
) -> Order {
    let order_id = new_id();
    let lines: Vec<OrderLine> = items
        .iter()
        .map(|(product, quantity)| {
            let subtotal = product.price().multiply_quantity(*quantity);
            OrderLine {
                id: new_id(),
                order_id: order_id.clone(),
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                unit_price_cents: product.price_cents,
                quantity: *quantity,
                discount_percent: 0,
                discount_label: None,
                discount_cents: 0,
                subtotal_cents: subtotal.cents(),
            }
        })
        .collect();

    let created = fixed_now() - Duration::days(30);
    let order = Order {
        id: order_id,
        customer_id: customer_id.to_string(),
        status,
        shipping_address: "Jl. Kaliurang Km 5".to_string(),
        shipping_fee_cents: 0,
        total_cents: lines.iter().map(|l| l.subtotal_cents).sum(),
        payment_deadline: created + Duration::hours(24),
        proof_artifact: None,
        feedback: None,
        feedback_photo: None,
        stock_committed: status.holds_stock(),
        created_at: created,
        updated_at: created,
    };

    let mut conn = db.pool().acquire().await.unwrap();
    OrderRepository::insert_in(&mut conn, &order, &lines).await.unwrap();
    order
}

pub async fn insert_grant(
    db: &Database,
    customer_id: &str,
    product_id: Option<&str>,
    percent: u32,
    message: &str,
) -> DiscountGrant {
    let grant = DiscountGrant {
        id: new_id(),
        customer_id: customer_id.to_string(),
        product_id: product_id.map(str::to_string),
        percent,
        status: GrantStatus::Active,
        source: GrantSource::Admin,
        message: message.to_string(),
        expires_at: None,
        created_at: fixed_now(),
    };
    db.discounts().insert(&grant).await.unwrap();
    grant
}

pub async fn product_stock(db: &Database, product_id: &str) -> i64 {
    db.products().get_by_id(product_id).await.unwrap().unwrap().stock
}

/// A sink that refuses everything.
#[derive(Debug)]
pub struct RejectingSink;

#[async_trait]
impl NotificationSink for RejectingSink {
    async fn deliver(&self, _intent: &NotificationIntent) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected("sink offline".to_string()))
    }
}
