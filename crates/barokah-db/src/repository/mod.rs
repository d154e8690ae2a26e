//! # Repository Module
//!
//! Database repository implementations for Barokah Commerce.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways In                                          │
//! │                                                                         │
//! │  Pool-backed reads/writes              Transaction-scoped functions    │
//! │  ────────────────────────              ────────────────────────────     │
//! │  db.products().get_by_id(id)           let mut tx = db.begin().await?; │
//! │  db.discounts().insert(&grant)         ProductRepository::find_in(     │
//! │  db.notifications().pending(50)            &mut tx, id)                │
//! │                                        OrderRepository::insert_in(     │
//! │  Own connection per call                   &mut tx, &order, &lines)    │
//! │                                        tx.commit().await?;             │
//! │                                                                         │
//! │  `_in` functions take `&mut SqliteConnection` so every statement of    │
//! │  one unit of work shares the caller's transaction.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Products, categories, stock edits
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers
//! - [`OrderRepository`](order::OrderRepository) - Orders, lines, spend aggregates
//! - [`DiscountRepository`](discount::DiscountRepository) - Discount grants
//! - [`NotificationRepository`](notification::NotificationRepository) - Notification outbox

pub mod customer;
pub mod discount;
pub mod notification;
pub mod order;
pub mod product;
