//! # barokah-db: Database Layer for Barokah Commerce
//!
//! Database access for the order and promotion engine: SQLite through sqlx,
//! embedded migrations, repositories and the inventory ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Barokah Commerce Data Flow                          │
//! │                                                                         │
//! │  OrderStateMachine::submit (barokah-engine)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     barokah-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │    │              │  │   │
//! │  │   │ begin()       │    │ DiscountRepo  │    └──────────────┘  │   │
//! │  │   └───────────────┘    │ ...           │                      │   │
//! │  │                        └───────────────┘    ┌──────────────┐  │   │
//! │  │                                             │InventoryLedger│ │   │
//! │  │                                             │ CAS debit    │  │   │
//! │  │                                             └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and ledger error types
//! - [`repository`] - Repository implementations
//! - [`ledger`] - Stock debits and credits
//!
//! ## Usage
//!
//! ```rust,ignore
//! use barokah_db::{Database, DbConfig, InventoryLedger};
//!
//! let db = Database::new(DbConfig::new("barokah.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! InventoryLedger::debit(&mut tx, &product_id, 3, now).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, LedgerError, LedgerResult};
pub use ledger::InventoryLedger;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::discount::DiscountRepository;
pub use repository::notification::{NotificationRepository, StoredNotification};
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;

// =============================================================================
// Test Fixtures
// =============================================================================
