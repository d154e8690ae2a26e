//! # Order State Machine
//!
//! Every operation that changes an order: checkout, status moves, payment
//! expiry, feedback and the admin edits.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  submit / transition / create_order / edit_line_quantity               │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    read order / customer / products                                     │
//! │    InventoryLedger::debit | credit   (compare-and-set per line)        │
//! │    write order + lines               (status write is compare-and-set) │
//! │  COMMIT ──────────────┐                                                 │
//! │                       ▼                                                 │
//! │              deliver_all(sink, intents)   failures only logged         │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: no partial debits,     │
//! │  no half-written orders, no notifications.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Accounting
//! The order's `stock_committed` flag records whether its lines are
//! currently debited. Transitions consult it through
//! [`plan_transition`], so a cancelled order is credited exactly once
//! whichever path (customer, admin, expiry) cancels it.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::config::EngineConfig;
use crate::error::{EditError, EngineResult, FeedbackError, SubmissionError, TransitionError};
use crate::notifier::{deliver_all, SharedSink};
use crate::pricing::PricingCalculator;
use barokah_core::lifecycle::{plan_transition, stock_effect_for};
use barokah_core::pricing::price_at_list;
use barokah_core::validation::{validate_price_cents, validate_quantity, validate_text};
use barokah_core::{
    new_id, Actor, CartLine, Money, NotificationIntent, Order, OrderLine, OrderStatus, StockEffect,
};
use barokah_db::{CustomerRepository, Database, InventoryLedger, LedgerResult, OrderRepository};

/// Longest accepted shipping address.
const MAX_ADDRESS_LEN: usize = 500;

/// Longest accepted feedback text.
const MAX_FEEDBACK_LEN: usize = 2_000;

/// An order entered by an admin on behalf of a customer.
///
/// Lines are priced at list price; automatic promotions only apply to
/// storefront checkouts.
#[derive(Debug, Clone)]
pub struct AdminOrderRequest {
    pub customer_id: String,
    /// Any status except CANCELLED.
    pub status: OrderStatus,
    pub lines: Vec<CartLine>,
    /// Empty falls back to the customer's stored address.
    pub shipping_address: String,
    pub shipping_fee: Money,
    pub proof_artifact: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderStateMachine {
    db: Database,
    clock: SharedClock,
    pricing: PricingCalculator,
    sink: SharedSink,
    payment_window: Duration,
}

impl OrderStateMachine {
    pub fn new(
        db: Database,
        clock: SharedClock,
        pricing: PricingCalculator,
        sink: SharedSink,
        config: &EngineConfig,
    ) -> Self {
        OrderStateMachine {
            db,
            clock,
            pricing,
            sink,
            payment_window: config.payment_window(),
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Turns a cart into a PROCESSING order.
    ///
    /// Discounts are resolved inside the transaction against the grant and
    /// loyalty state at that moment, so the order may differ from an earlier
    /// preview if an admin changed grants in between.
    ///
    /// ## Returns
    /// The new order's id.
    pub async fn submit(
        &self,
        customer_id: &str,
        cart: &[CartLine],
        shipping_address: &str,
        proof_artifact: Option<&str>,
    ) -> Result<String, SubmissionError> {
        let now = self.clock.now();
        let mut tx = self.db.begin().await?;

        let customer = CustomerRepository::find_in(&mut tx, customer_id)
            .await?
            .ok_or_else(|| SubmissionError::CustomerNotFound(customer_id.to_string()))?;
        let address = resolve_address(shipping_address, &customer.address)?;

        let priced = self.pricing.price_in(&mut tx, &customer, cart, now).await?;

        for (product, quantity) in &priced.items {
            InventoryLedger::debit(&mut tx, &product.id, *quantity, now).await?;
        }

        let order_id = new_id();
        let lines: Vec<OrderLine> = priced
            .pricing
            .lines
            .iter()
            .map(|line| line.to_order_line(&order_id))
            .collect();

        let order = Order {
            id: order_id,
            customer_id: customer.id.clone(),
            status: OrderStatus::Processing,
            shipping_address: address,
            shipping_fee_cents: 0,
            total_cents: priced.pricing.subtotal_after_discount.cents(),
            payment_deadline: now + self.payment_window,
            proof_artifact: proof_artifact.map(str::to_string),
            feedback: None,
            feedback_photo: None,
            stock_committed: true,
            created_at: now,
            updated_at: now,
        };

        OrderRepository::insert_in(&mut tx, &order, &lines).await?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            customer_id = %customer.id,
            total = %order.total(),
            discount = %priced.pricing.total_discount,
            lines = lines.len(),
            "Order submitted"
        );

        let intent = NotificationIntent::order_created(&customer.id, &order.id, order.payment_deadline);
        deliver_all(self.sink.as_ref(), &[intent]).await;

        Ok(order.id)
    }

    // =========================================================================
    // Status Transitions
    // =========================================================================

    /// Moves an order from `expected` to `next`.
    ///
    /// `expected` is the status the caller last saw. If the stored status
    /// differs, nothing is written and the caller gets
    /// [`TransitionError::ConcurrentModification`] so it can refresh.
    pub async fn transition(
        &self,
        order_id: &str,
        expected: OrderStatus,
        next: OrderStatus,
        actor: &Actor,
    ) -> Result<(), TransitionError> {
        let now = self.clock.now();
        let mut tx = self.db.begin().await?;

        let order = OrderRepository::find_in(&mut tx, order_id)
            .await?
            .ok_or_else(|| TransitionError::OrderNotFound(order_id.to_string()))?;

        if order.status != expected {
            return Err(TransitionError::ConcurrentModification {
                expected,
                actual: order.status,
            });
        }

        let plan = plan_transition(expected, next, order.stock_committed)
            .map_err(|_| TransitionError::IllegalTransition { from: expected, to: next })?;

        if plan.stock_effect != StockEffect::None {
            let lines = OrderRepository::lines_in(&mut tx, order_id).await?;
            apply_stock_effect(&mut tx, plan.stock_effect, &lines, now).await?;
        }

        let applied =
            OrderRepository::update_status_in(&mut tx, order_id, expected, next, plan.stock_committed_after, now)
                .await?;
        if !applied {
            let actual = OrderRepository::find_in(&mut tx, order_id)
                .await?
                .map_or(expected, |o| o.status);
            return Err(TransitionError::ConcurrentModification { expected, actual });
        }

        tx.commit().await?;

        info!(
            order_id = %order_id,
            from = %expected,
            to = %next,
            actor = %actor,
            stock = ?plan.stock_effect,
            "Order status changed"
        );

        if let Some(intent) = transition_intent(&order, next, actor) {
            deliver_all(self.sink.as_ref(), &[intent]).await;
        }

        Ok(())
    }

    /// Cancels every PROCESSING order whose payment deadline has passed.
    ///
    /// Orders that moved on concurrently are skipped and logged. Running the
    /// sweep twice cancels (and credits) nothing the second time.
    ///
    /// ## Returns
    /// How many orders were cancelled.
    pub async fn expire_overdue(&self) -> EngineResult<usize> {
        let now = self.clock.now();
        let candidates = self.db.orders().list_by_status(OrderStatus::Processing).await?;

        let mut expired = 0;
        for order in candidates.iter().filter(|o| o.is_payment_overdue(now)) {
            match self
                .transition(&order.id, OrderStatus::Processing, OrderStatus::Cancelled, &Actor::System)
                .await
            {
                Ok(()) => expired += 1,
                Err(TransitionError::Db(e)) => return Err(e.into()),
                Err(e) => warn!(order_id = %order.id, error = %e, "Skipping overdue order"),
            }
        }

        if expired > 0 {
            info!(expired, "Overdue orders cancelled");
        } else {
            debug!("No overdue orders");
        }

        Ok(expired)
    }

    // =========================================================================
    // Feedback
    // =========================================================================

    /// Stores customer feedback on a COMPLETED order.
    pub async fn record_feedback(
        &self,
        order_id: &str,
        text: &str,
        photo_artifact: Option<&str>,
    ) -> Result<(), FeedbackError> {
        validate_text("feedback", text, MAX_FEEDBACK_LEN)?;

        let now = self.clock.now();
        let mut conn = self.db.pool().acquire().await?;

        let stored = OrderRepository::set_feedback_in(&mut conn, order_id, text.trim(), photo_artifact, now).await?;
        if !stored {
            return match OrderRepository::find_in(&mut conn, order_id).await? {
                None => Err(FeedbackError::OrderNotFound(order_id.to_string())),
                Some(order) => Err(FeedbackError::OrderNotCompleted(order.status)),
            };
        }

        info!(order_id = %order_id, photo = photo_artifact.is_some(), "Feedback recorded");
        Ok(())
    }

    // =========================================================================
    // Admin Operations
    // =========================================================================

    /// Creates an order directly in `request.status`.
    ///
    /// Stock is debited up front when that status holds stock.
    pub async fn create_order(&self, request: AdminOrderRequest) -> Result<String, SubmissionError> {
        if !request.status.is_valid_initial() {
            return Err(SubmissionError::InvalidInitialStatus(request.status));
        }
        validate_price_cents("shipping_fee", request.shipping_fee.cents())?;

        let now = self.clock.now();
        let mut tx = self.db.begin().await?;

        let customer = CustomerRepository::find_in(&mut tx, &request.customer_id)
            .await?
            .ok_or_else(|| SubmissionError::CustomerNotFound(request.customer_id.clone()))?;
        let address = resolve_address(&request.shipping_address, &customer.address)?;

        let items = self.pricing.load_cart_in(&mut tx, &request.lines).await?;
        let pricing = price_at_list(&items);

        let stock_effect = stock_effect_for(request.status, false);
        if stock_effect == StockEffect::Debit {
            for (product, quantity) in &items {
                InventoryLedger::debit(&mut tx, &product.id, *quantity, now).await?;
            }
        }

        let order_id = new_id();
        let lines: Vec<OrderLine> = pricing
            .lines
            .iter()
            .map(|line| line.to_order_line(&order_id))
            .collect();

        let order = Order {
            id: order_id,
            customer_id: customer.id.clone(),
            status: request.status,
            shipping_address: address,
            shipping_fee_cents: request.shipping_fee.cents(),
            total_cents: (pricing.subtotal_after_discount + request.shipping_fee).cents(),
            payment_deadline: now + self.payment_window,
            proof_artifact: request.proof_artifact.clone(),
            feedback: None,
            feedback_photo: None,
            stock_committed: stock_effect == StockEffect::Debit,
            created_at: now,
            updated_at: now,
        };

        OrderRepository::insert_in(&mut tx, &order, &lines).await?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            customer_id = %customer.id,
            status = %order.status,
            total = %order.total(),
            "Admin order created"
        );

        if order.status == OrderStatus::Processing {
            let intent = NotificationIntent::order_created(&customer.id, &order.id, order.payment_deadline);
            deliver_all(self.sink.as_ref(), &[intent]).await;
        }

        Ok(order.id)
    }

    /// Changes one line's quantity on a PROCESSING or PAID order.
    ///
    /// The line keeps its frozen unit price and discount percent. If the
    /// order holds stock, only the difference is debited or credited.
    pub async fn edit_line_quantity(
        &self,
        order_id: &str,
        line_id: &str,
        quantity: i64,
    ) -> Result<Order, EditError> {
        validate_quantity(quantity)?;

        let now = self.clock.now();
        let mut tx = self.db.begin().await?;

        let order = OrderRepository::find_in(&mut tx, order_id)
            .await?
            .ok_or_else(|| EditError::OrderNotFound(order_id.to_string()))?;
        if !matches!(order.status, OrderStatus::Processing | OrderStatus::Paid) {
            return Err(EditError::OrderNotEditable(order.status));
        }

        let mut lines = OrderRepository::lines_in(&mut tx, order_id).await?;
        let line = lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| EditError::LineNotFound {
                order_id: order_id.to_string(),
                line_id: line_id.to_string(),
            })?;

        let delta = quantity - line.quantity;
        if order.stock_committed {
            if delta > 0 {
                InventoryLedger::debit(&mut tx, &line.product_id, delta, now).await?;
            } else if delta < 0 {
                InventoryLedger::credit(&mut tx, &line.product_id, -delta, now).await?;
            }
        }

        line.reprice(quantity);
        OrderRepository::update_line_in(&mut tx, line).await?;

        let total = order_total(&lines, order.shipping_fee());
        OrderRepository::update_totals_in(&mut tx, order_id, order.shipping_fee_cents, total.cents(), now).await?;

        let updated = OrderRepository::find_in(&mut tx, order_id)
            .await?
            .ok_or_else(|| EditError::OrderNotFound(order_id.to_string()))?;
        tx.commit().await?;

        info!(order_id = %order_id, line_id = %line_id, delta, total = %total, "Order line edited");
        Ok(updated)
    }

    /// Sets the shipping fee of an order that is not yet finished.
    pub async fn set_shipping_fee(&self, order_id: &str, fee: Money) -> Result<Order, EditError> {
        validate_price_cents("shipping_fee", fee.cents())?;

        let now = self.clock.now();
        let mut tx = self.db.begin().await?;

        let order = OrderRepository::find_in(&mut tx, order_id)
            .await?
            .ok_or_else(|| EditError::OrderNotFound(order_id.to_string()))?;
        if order.status.is_terminal() {
            return Err(EditError::OrderNotEditable(order.status));
        }

        let lines = OrderRepository::lines_in(&mut tx, order_id).await?;
        let total = order_total(&lines, fee);
        OrderRepository::update_totals_in(&mut tx, order_id, fee.cents(), total.cents(), now).await?;

        let updated = OrderRepository::find_in(&mut tx, order_id)
            .await?
            .ok_or_else(|| EditError::OrderNotFound(order_id.to_string()))?;
        tx.commit().await?;

        info!(order_id = %order_id, fee = %fee, total = %total, "Shipping fee set");
        Ok(updated)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Debits or credits every line of an order.
async fn apply_stock_effect(
    conn: &mut SqliteConnection,
    effect: StockEffect,
    lines: &[OrderLine],
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    for line in lines {
        match effect {
            StockEffect::Debit => {
                InventoryLedger::debit(conn, &line.product_id, line.quantity, now).await?
            }
            StockEffect::Credit => {
                InventoryLedger::credit(conn, &line.product_id, line.quantity, now).await?
            }
            StockEffect::None => {}
        }
    }
    Ok(())
}

/// Σ line subtotals + shipping fee.
fn order_total(lines: &[OrderLine], shipping_fee: Money) -> Money {
    lines.iter().map(OrderLine::subtotal).sum::<Money>() + shipping_fee
}

/// The requested address, or the customer's own when left blank.
fn resolve_address(requested: &str, fallback: &str) -> Result<String, SubmissionError> {
    let requested = requested.trim();
    if requested.is_empty() {
        return Ok(fallback.to_string());
    }
    validate_text("shipping_address", requested, MAX_ADDRESS_LEN)?;
    Ok(requested.to_string())
}

/// What to tell the customer after a committed move.
fn transition_intent(order: &Order, next: OrderStatus, actor: &Actor) -> Option<NotificationIntent> {
    match (next, actor) {
        (OrderStatus::Shipped, _) => Some(NotificationIntent::order_shipped(&order.customer_id, &order.id)),
        (OrderStatus::Completed, _) => Some(NotificationIntent::order_completed(&order.customer_id, &order.id)),
        (OrderStatus::Cancelled, Actor::System) => {
            Some(NotificationIntent::payment_expired(&order.customer_id, &order.id))
        }
        (OrderStatus::Cancelled, _) => Some(NotificationIntent::order_cancelled(&order.customer_id, &order.id)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use barokah_core::discount::LABEL_BIRTHDAY_CONDITIONAL;
    use barokah_core::NotificationCategory;
    use std::sync::Arc;

    fn admin() -> Actor {
        Actor::Admin("admin-1".to_string())
    }

    // -------------------------------------------------------------------------
    // submit
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_submit_debits_stock_and_creates_processing_order() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 100).await;
        let bata = insert_product(&h.db, "Bata Merah", 800, 5_000).await;
        insert_grant(&h.db, &budi.id, Some(&semen.id), 10, "").await;

        let order_id = h
            .orders
            .submit(
                &budi.id,
                &[CartLine::new(&semen.id, 20), CartLine::new(&bata.id, 1_000)],
                "Proyek Gudang, Jl. Magelang Km 10",
                Some("proof/transfer-001.jpg"),
            )
            .await
            .unwrap();

        assert_eq!(product_stock(&h.db, &semen.id).await, 80);
        assert_eq!(product_stock(&h.db, &bata.id).await, 4_000);

        let order = h.db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert!(order.stock_committed);
        assert_eq!(order.payment_deadline, h.clock_now() + Duration::hours(24));
        assert_eq!(order.shipping_address, "Proyek Gudang, Jl. Magelang Km 10");
        assert_eq!(order.proof_artifact.as_deref(), Some("proof/transfer-001.jpg"));
        // 1.300.000 − 130.000 + 800.000
        assert_eq!(order.total(), Money::from_major(1_970_000));

        let lines = h.db.orders().get_lines(&order_id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].discount_percent, 10);
        assert_eq!(lines[0].discount_cents, Money::from_major(130_000).cents());
        assert_eq!(lines[1].discount_percent, 0);

        let sent = h.sink.delivered();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].category, NotificationCategory::OrderCreated);
        assert_eq!(sent[0].customer_id, budi.id);
    }

    #[tokio::test]
    async fn test_submit_insufficient_stock_leaves_stock_untouched() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let besi = insert_product(&h.db, "Besi Beton 10mm", 95_000, 3).await;

        let err = h
            .orders
            .submit(&budi.id, &[CartLine::new(&besi.id, 5)], "", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubmissionError::InsufficientStock { ref product_name, available: 3, requested: 5 }
                if product_name == "Besi Beton 10mm"
        ));
        assert_eq!(product_stock(&h.db, &besi.id).await, 3);
        assert!(h.db.orders().list_for_customer(&budi.id).await.unwrap().is_empty());
        assert!(h.sink.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_submit_is_all_or_nothing_across_lines() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 100).await;
        let pasir = insert_product(&h.db, "Pasir 1m3", 250_000, 2).await;

        let result = h
            .orders
            .submit(
                &budi.id,
                &[CartLine::new(&semen.id, 40), CartLine::new(&pasir.id, 3)],
                "",
                None,
            )
            .await;

        assert!(matches!(result, Err(SubmissionError::InsufficientStock { .. })));
        assert_eq!(product_stock(&h.db, &semen.id).await, 100);
        assert_eq!(product_stock(&h.db, &pasir.id).await, 2);
        assert!(h.db.orders().list_for_customer(&budi.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_blank_address_uses_customer_address() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 10).await;

        let order_id = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 1)], "   ", None)
            .await
            .unwrap();

        let order = h.db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.shipping_address, budi.address);
    }

    #[tokio::test]
    async fn test_submit_rejects_unknown_customer_and_empty_cart() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 10).await;

        let err = h
            .orders
            .submit("ghost", &[CartLine::new(&semen.id, 1)], "", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::CustomerNotFound(_)));

        let err = h.orders.submit(&budi.id, &[], "", None).await.unwrap_err();
        assert!(matches!(err, SubmissionError::EmptyCart));

        let err = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 0)], "", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_submit_freezes_conditional_birthday_discount() {
        let h = Harness::new().await;
        let siti = insert_customer(&h.db, "siti", today_birthday(&h)).await;
        let besi = insert_product(&h.db, "Besi Beton 12mm", 2_600_000, 10).await;

        let order_id = h
            .orders
            .submit(&siti.id, &[CartLine::new(&besi.id, 2)], "", None)
            .await
            .unwrap();

        let lines = h.db.orders().get_lines(&order_id).await.unwrap();
        assert_eq!(lines[0].discount_label.as_deref(), Some(LABEL_BIRTHDAY_CONDITIONAL));
        assert_eq!(lines[0].discount_cents, Money::from_major(520_000).cents());

        let order = h.db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.total(), Money::from_major(4_680_000));
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_undo_commit() {
        let h = Harness::new().await;
        let orders = OrderStateMachine::new(
            h.db.clone(),
            h.clock.clone(),
            h.pricing.clone(),
            Arc::new(RejectingSink),
            &h.config,
        );
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 10).await;

        let order_id = orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 4)], "", None)
            .await
            .unwrap();

        assert!(h.db.orders().get_by_id(&order_id).await.unwrap().is_some());
        assert_eq!(product_stock(&h.db, &semen.id).await, 6);
    }

    // -------------------------------------------------------------------------
    // transition
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_paid_then_cancelled_nets_to_zero() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 50).await;

        let order_id = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 10)], "", None)
            .await
            .unwrap();
        assert_eq!(product_stock(&h.db, &semen.id).await, 40);

        h.orders
            .transition(&order_id, OrderStatus::Processing, OrderStatus::Paid, &admin())
            .await
            .unwrap();
        assert_eq!(product_stock(&h.db, &semen.id).await, 40);

        h.orders
            .transition(&order_id, OrderStatus::Paid, OrderStatus::Cancelled, &admin())
            .await
            .unwrap();
        assert_eq!(product_stock(&h.db, &semen.id).await, 50);

        let order = h.db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(!order.stock_committed);

        let last = h.sink.delivered().pop().unwrap();
        assert_eq!(last.category, NotificationCategory::OrderCancelled);
    }

    #[tokio::test]
    async fn test_shipped_and_completed_notify_customer() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 50).await;
        let order_id = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 1)], "", None)
            .await
            .unwrap();
        h.sink.take();

        h.orders
            .transition(&order_id, OrderStatus::Processing, OrderStatus::Paid, &admin())
            .await
            .unwrap();
        h.orders
            .transition(&order_id, OrderStatus::Paid, OrderStatus::Shipped, &admin())
            .await
            .unwrap();
        h.orders
            .transition(&order_id, OrderStatus::Shipped, OrderStatus::Completed, &admin())
            .await
            .unwrap();

        let categories: Vec<_> = h.sink.take().into_iter().map(|n| n.category).collect();
        assert_eq!(
            categories,
            vec![NotificationCategory::OrderShipped, NotificationCategory::OrderCompleted]
        );
        // Delivered goods stay out of stock
        assert_eq!(product_stock(&h.db, &semen.id).await, 49);
    }

    #[tokio::test]
    async fn test_illegal_transitions_change_nothing() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 50).await;
        let order_id = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 5)], "", None)
            .await
            .unwrap();

        let err = h
            .orders
            .transition(&order_id, OrderStatus::Processing, OrderStatus::Shipped, &admin())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::IllegalTransition { from: OrderStatus::Processing, to: OrderStatus::Shipped }
        ));
        assert!(!err.is_retryable());

        let err = h
            .orders
            .transition(&order_id, OrderStatus::Processing, OrderStatus::Processing, &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::IllegalTransition { .. }));

        let order = h.db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(product_stock(&h.db, &semen.id).await, 45);
    }

    #[tokio::test]
    async fn test_stale_expected_status_is_concurrent_modification() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 50).await;
        let order_id = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 5)], "", None)
            .await
            .unwrap();

        h.orders
            .transition(&order_id, OrderStatus::Processing, OrderStatus::Cancelled, &Actor::Customer(budi.id.clone()))
            .await
            .unwrap();

        // An admin still looking at the PROCESSING order
        let err = h
            .orders
            .transition(&order_id, OrderStatus::Processing, OrderStatus::Paid, &admin())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::ConcurrentModification { expected: OrderStatus::Processing, actual: OrderStatus::Cancelled }
        ));
        assert!(err.is_retryable());
        assert_eq!(product_stock(&h.db, &semen.id).await, 50);
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let h = Harness::new().await;
        let err = h
            .orders
            .transition("missing", OrderStatus::Processing, OrderStatus::Paid, &admin())
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::OrderNotFound(_)));
    }

    // -------------------------------------------------------------------------
    // expire_overdue
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_expiry_cancels_and_credits_exactly_once() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 30).await;
        let cat = insert_product(&h.db, "Cat Tembok 5kg", 120_000, 10).await;

        let overdue = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 10), CartLine::new(&cat.id, 4)], "", None)
            .await
            .unwrap();

        h.clock.advance(Duration::hours(23));
        let fresh = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 5)], "", None)
            .await
            .unwrap();
        h.sink.take();

        // First order is now 25h old, second 2h old
        h.clock.advance(Duration::hours(2));
        assert_eq!(h.orders.expire_overdue().await.unwrap(), 1);
        assert_eq!(product_stock(&h.db, &semen.id).await, 25);
        assert_eq!(product_stock(&h.db, &cat.id).await, 10);

        let order = h.db.orders().get_by_id(&overdue).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);
        let still_open = h.db.orders().get_by_id(&fresh).await.unwrap().unwrap();
        assert_eq!(still_open.status, OrderStatus::Processing);

        let sent = h.sink.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].category, NotificationCategory::PaymentExpired);

        // Second run: nothing left to expire, no double credit
        assert_eq!(h.orders.expire_overdue().await.unwrap(), 0);
        assert_eq!(product_stock(&h.db, &semen.id).await, 25);
    }

    #[tokio::test]
    async fn test_expiry_skips_paid_orders() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 30).await;
        let order_id = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 10)], "", None)
            .await
            .unwrap();
        h.orders
            .transition(&order_id, OrderStatus::Processing, OrderStatus::Paid, &admin())
            .await
            .unwrap();

        h.clock.advance(Duration::days(3));
        assert_eq!(h.orders.expire_overdue().await.unwrap(), 0);
        assert_eq!(product_stock(&h.db, &semen.id).await, 20);
    }

    // -------------------------------------------------------------------------
    // record_feedback
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_feedback_only_on_completed_orders() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 30).await;
        let order_id = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 1)], "", None)
            .await
            .unwrap();

        let err = h.orders.record_feedback(&order_id, "Mantap", None).await.unwrap_err();
        assert!(matches!(err, FeedbackError::OrderNotCompleted(OrderStatus::Processing)));

        let err = h.orders.record_feedback("missing", "Mantap", None).await.unwrap_err();
        assert!(matches!(err, FeedbackError::OrderNotFound(_)));

        for (from, to) in [
            (OrderStatus::Processing, OrderStatus::Paid),
            (OrderStatus::Paid, OrderStatus::Shipped),
            (OrderStatus::Shipped, OrderStatus::Completed),
        ] {
            h.orders.transition(&order_id, from, to, &admin()).await.unwrap();
        }

        h.orders
            .record_feedback(&order_id, "Barang sampai utuh", Some("feedback/semen.jpg"))
            .await
            .unwrap();

        let order = h.db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.feedback.as_deref(), Some("Barang sampai utuh"));
        assert_eq!(order.feedback_photo.as_deref(), Some("feedback/semen.jpg"));

        let err = h.orders.record_feedback(&order_id, "  ", None).await.unwrap_err();
        assert!(matches!(err, FeedbackError::Validation(_)));
    }

    // -------------------------------------------------------------------------
    // admin operations
    // -------------------------------------------------------------------------

    fn admin_request(customer_id: &str, status: OrderStatus, lines: Vec<CartLine>) -> AdminOrderRequest {
        AdminOrderRequest {
            customer_id: customer_id.to_string(),
            status,
            lines,
            shipping_address: String::new(),
            shipping_fee: Money::from_major(50_000),
            proof_artifact: None,
        }
    }

    #[tokio::test]
    async fn test_admin_order_at_list_price_with_fee() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 30).await;
        insert_grant(&h.db, &budi.id, None, 20, "").await;

        let order_id = h
            .orders
            .create_order(admin_request(&budi.id, OrderStatus::Paid, vec![CartLine::new(&semen.id, 10)]))
            .await
            .unwrap();

        let order = h.db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.stock_committed);
        assert_eq!(order.total(), Money::from_major(700_000));
        assert_eq!(product_stock(&h.db, &semen.id).await, 20);
        // Not PROCESSING, nothing to pay
        assert!(h.sink.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_admin_order_initial_status_rules() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 30).await;

        let err = h
            .orders
            .create_order(admin_request(&budi.id, OrderStatus::Cancelled, vec![CartLine::new(&semen.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::InvalidInitialStatus(OrderStatus::Cancelled)));

        // Already delivered: recorded without touching stock
        let order_id = h
            .orders
            .create_order(admin_request(&budi.id, OrderStatus::Completed, vec![CartLine::new(&semen.id, 5)]))
            .await
            .unwrap();
        let order = h.db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert!(!order.stock_committed);
        assert_eq!(product_stock(&h.db, &semen.id).await, 30);
    }

    #[tokio::test]
    async fn test_edit_line_moves_stock_delta_and_keeps_total() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 30).await;
        let bata = insert_product(&h.db, "Bata Merah", 800, 10_000).await;
        insert_grant(&h.db, &budi.id, Some(&semen.id), 10, "").await;

        let order_id = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 10), CartLine::new(&bata.id, 500)], "", None)
            .await
            .unwrap();
        h.orders.set_shipping_fee(&order_id, Money::from_major(75_000)).await.unwrap();
        let lines = h.db.orders().get_lines(&order_id).await.unwrap();

        let order = h.orders.edit_line_quantity(&order_id, &lines[0].id, 15).await.unwrap();
        assert_eq!(product_stock(&h.db, &semen.id).await, 15);

        let lines = h.db.orders().get_lines(&order_id).await.unwrap();
        assert_eq!(lines[0].quantity, 15);
        // 975.000 − 97.500, discount percent stays locked
        assert_eq!(lines[0].subtotal(), Money::from_major(877_500));
        let sum: Money = lines.iter().map(|l| l.subtotal()).sum();
        assert_eq!(order.total(), sum + Money::from_major(75_000));

        h.orders.edit_line_quantity(&order_id, &lines[1].id, 200).await.unwrap();
        assert_eq!(product_stock(&h.db, &bata.id).await, 9_800);
    }

    #[tokio::test]
    async fn test_edit_line_rules() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 12).await;
        let order_id = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 10)], "", None)
            .await
            .unwrap();
        let line_id = h.db.orders().get_lines(&order_id).await.unwrap()[0].id.clone();

        let err = h.orders.edit_line_quantity(&order_id, &line_id, 13).await.unwrap_err();
        assert!(matches!(err, EditError::InsufficientStock { available: 2, requested: 3, .. }));
        assert_eq!(product_stock(&h.db, &semen.id).await, 2);

        let err = h.orders.edit_line_quantity(&order_id, "nope", 1).await.unwrap_err();
        assert!(matches!(err, EditError::LineNotFound { .. }));

        h.orders
            .transition(&order_id, OrderStatus::Processing, OrderStatus::Paid, &admin())
            .await
            .unwrap();
        h.orders
            .transition(&order_id, OrderStatus::Paid, OrderStatus::Shipped, &admin())
            .await
            .unwrap();
        let err = h.orders.edit_line_quantity(&order_id, &line_id, 1).await.unwrap_err();
        assert!(matches!(err, EditError::OrderNotEditable(OrderStatus::Shipped)));
    }

    #[tokio::test]
    async fn test_shipping_fee_on_finished_order_rejected() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 12).await;
        let order_id = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 1)], "", None)
            .await
            .unwrap();
        h.orders
            .transition(&order_id, OrderStatus::Processing, OrderStatus::Cancelled, &admin())
            .await
            .unwrap();

        let err = h
            .orders
            .set_shipping_fee(&order_id, Money::from_major(10_000))
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::OrderNotEditable(OrderStatus::Cancelled)));
    }

    // -------------------------------------------------------------------------
    // concurrent units of work (file-backed pool)
    // -------------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_all_succeed_when_stock_allows() {
        let dir = tempfile::tempdir().unwrap();
        let h = Harness::on_file(dir.path()).await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 100).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let orders = h.orders.clone();
                let customer_id = budi.id.clone();
                let cart = vec![CartLine::new(&semen.id, 3)];
                tokio::spawn(async move { orders.submit(&customer_id, &cart, "", None).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(product_stock(&h.db, &semen.id).await, 76);
        assert_eq!(h.db.orders().list_for_customer(&budi.id).await.unwrap().len(), 8);
        h.db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checkouts_for_last_units_fail_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let h = Harness::on_file(dir.path()).await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 5).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let orders = h.orders.clone();
                let customer_id = budi.id.clone();
                let cart = vec![CartLine::new(&semen.id, 3)];
                tokio::spawn(async move { orders.submit(&customer_id, &cart, "", None).await })
            })
            .collect();

        let mut placed = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(SubmissionError::InsufficientStock { available, requested, .. }) => {
                    assert_eq!(available, 2);
                    assert_eq!(requested, 3);
                }
                Err(other) => panic!("checkout failed for the wrong reason: {other}"),
            }
        }

        assert_eq!(placed, 1);
        assert_eq!(product_stock(&h.db, &semen.id).await, 2);
        h.db.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_payment_racing_expiry_has_exactly_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let h = Harness::on_file(dir.path()).await;
        let budi = insert_customer(&h.db, "budi", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 65_000, 30).await;
        let order_id = h
            .orders
            .submit(&budi.id, &[CartLine::new(&semen.id, 10)], "", None)
            .await
            .unwrap();
        h.clock.advance(Duration::hours(25));

        let payer = h.orders.clone();
        let paid_id = order_id.clone();
        let payment = tokio::spawn(async move {
            payer
                .transition(&paid_id, OrderStatus::Processing, OrderStatus::Paid, &admin())
                .await
        });
        let sweeper = h.orders.clone();
        let sweep = tokio::spawn(async move { sweeper.expire_overdue().await });

        let payment = payment.await.unwrap();
        let expired = sweep.await.unwrap().unwrap();

        let order = h.db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        match payment {
            Ok(()) => {
                assert_eq!(expired, 0);
                assert_eq!(order.status, OrderStatus::Paid);
                assert_eq!(product_stock(&h.db, &semen.id).await, 20);
            }
            Err(TransitionError::ConcurrentModification { expected, actual }) => {
                assert_eq!(expected, OrderStatus::Processing);
                assert_eq!(actual, OrderStatus::Cancelled);
                assert_eq!(expired, 1);
                assert_eq!(order.status, OrderStatus::Cancelled);
                assert_eq!(product_stock(&h.db, &semen.id).await, 30);
            }
            Err(other) => panic!("payment failed for the wrong reason: {other}"),
        }
        h.db.close().await;
    }
}
