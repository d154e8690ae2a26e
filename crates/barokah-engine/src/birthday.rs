//! # Birthday Sweep
//!
//! Daily job that greets customers on their birthday with the promotion
//! they qualify for.
//!
//! ```text
//!   customers whose birthday is today (store calendar)
//!        │
//!        ├── loyal ──────► "birthday loyalty discount" intent
//!        │                 + materialized mode: one BIRTHDAY_RULE grant per
//!        │                   top product, expiring at the next local midnight
//!        │
//!        └── not loyal ──► "birthday conditional discount" intent
//! ```
//!
//! Safe to run repeatedly on the same day: grants are inserted with
//! `INSERT OR IGNORE` on (customer, product, expiry), and the outbox drops
//! a second birthday intent for the same customer and day.

use serde::Serialize;
use tracing::{debug, info};

use crate::clock::SharedClock;
use crate::error::EngineResult;
use crate::loyalty::LoyaltyEvaluator;
use crate::notifier::{deliver_all, SharedSink};
use barokah_core::discount::LABEL_BIRTHDAY_LOYAL;
use barokah_core::loyalty::{end_of_store_day, store_date};
use barokah_core::{
    new_id, BirthdayDiscountMode, DiscountGrant, GrantSource, GrantStatus, NotificationIntent, PromotionPolicy,
};
use barokah_db::Database;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub birthdays: usize,
    pub loyal: usize,
    pub conditional: usize,
    /// Birthday-rule grants written by this run (materialized mode only).
    pub grants_created: usize,
    /// Intents the sink accepted.
    pub notified: usize,
}

#[derive(Debug, Clone)]
pub struct BirthdaySweep {
    db: Database,
    clock: SharedClock,
    loyalty: LoyaltyEvaluator,
    sink: SharedSink,
    policy: PromotionPolicy,
}

impl BirthdaySweep {
    pub fn new(
        db: Database,
        clock: SharedClock,
        loyalty: LoyaltyEvaluator,
        sink: SharedSink,
        policy: PromotionPolicy,
    ) -> Self {
        BirthdaySweep {
            db,
            clock,
            loyalty,
            sink,
            policy,
        }
    }

    pub async fn run(&self) -> EngineResult<SweepReport> {
        let now = self.clock.now();
        let offset = self.loyalty.offset();
        let customers = self.db.customers().list_all().await?;

        let mut report = SweepReport::default();
        let mut intents = Vec::new();

        for customer in customers.iter().filter(|c| self.loyalty.is_birthday_at(c, now)) {
            report.birthdays += 1;

            // Released before any grant insert: in-memory pools hold one connection
            let snapshot = {
                let mut conn = self.db.pool().acquire().await?;
                self.loyalty.snapshot_in(&mut conn, customer, now).await?
            };

            if !snapshot.is_loyal {
                report.conditional += 1;
                intents.push(NotificationIntent::birthday_conditional(
                    &customer.id,
                    self.policy.birthday_percent,
                    self.policy.conditional_cart_threshold,
                ));
                continue;
            }

            report.loyal += 1;

            if self.policy.birthday_mode == BirthdayDiscountMode::Materialized {
                let expires_at = end_of_store_day(now, offset);
                for product_id in &snapshot.top_products {
                    let grant = DiscountGrant {
                        id: new_id(),
                        customer_id: customer.id.clone(),
                        product_id: Some(product_id.clone()),
                        percent: self.policy.birthday_percent,
                        status: GrantStatus::Active,
                        source: GrantSource::BirthdayRule,
                        message: LABEL_BIRTHDAY_LOYAL.to_string(),
                        expires_at: Some(expires_at),
                        created_at: now,
                    };

                    if self.db.discounts().insert_birthday_grant(&grant).await? {
                        report.grants_created += 1;
                    } else {
                        debug!(customer_id = %customer.id, product_id = %product_id, "Birthday grant already exists");
                    }
                }
            }

            intents.push(NotificationIntent::birthday_loyal(
                &customer.id,
                self.policy.birthday_percent,
                snapshot.top_products.len(),
            ));
        }

        report.notified = deliver_all(self.sink.as_ref(), &intents).await;

        info!(
            day = %store_date(now, offset),
            birthdays = report.birthdays,
            loyal = report.loyal,
            conditional = report.conditional,
            grants = report.grants_created,
            "Birthday sweep finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use crate::EngineConfig;
    use barokah_core::{CartLine, DiscountRule, Money, NotificationCategory, OrderStatus};
    use chrono::Duration;

    #[tokio::test]
    async fn test_sweep_greets_only_todays_birthdays() {
        let h = Harness::new().await;
        let budi = insert_customer(&h.db, "budi", today_birthday(&h)).await;
        let siti = insert_customer(&h.db, "siti", today_birthday(&h)).await;
        insert_customer(&h.db, "agus", not_today_birthday()).await;
        let semen = insert_product(&h.db, "Semen 50kg", 1_000_000, 100).await;
        insert_order(&h.db, &budi.id, OrderStatus::Completed, &[(&semen, 6)]).await;

        let report = h.birthday.run().await.unwrap();
        assert_eq!(report.birthdays, 2);
        assert_eq!(report.loyal, 1);
        assert_eq!(report.conditional, 1);
        assert_eq!(report.grants_created, 0);
        assert_eq!(report.notified, 2);

        let sent = h.sink.delivered();
        let loyal = sent.iter().find(|n| n.customer_id == budi.id).unwrap();
        assert_eq!(loyal.category, NotificationCategory::BirthdayLoyal);
        let conditional = sent.iter().find(|n| n.customer_id == siti.id).unwrap();
        assert_eq!(conditional.category, NotificationCategory::BirthdayConditional);

        // Per-resolve mode writes no grants
        assert!(h.db.discounts().list_for_customer(&budi.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_materialized_grants_are_idempotent_and_expire_at_midnight() {
        let mut config = EngineConfig::default();
        config.promotions.birthday_discount_mode = BirthdayDiscountMode::Materialized;
        let h = Harness::with_config(config).await;

        let budi = insert_customer(&h.db, "budi", today_birthday(&h)).await;
        let semen = insert_product(&h.db, "Semen 50kg", 1_000_000, 100).await;
        let cat = insert_product(&h.db, "Cat Tembok", 500_000, 100).await;
        insert_order(&h.db, &budi.id, OrderStatus::Completed, &[(&semen, 5), (&cat, 2)]).await;

        let first = h.birthday.run().await.unwrap();
        assert_eq!(first.grants_created, 2);

        h.clock.advance(Duration::hours(2));
        let second = h.birthday.run().await.unwrap();
        assert_eq!(second.grants_created, 0);

        let grants = h.db.discounts().list_for_customer(&budi.id).await.unwrap();
        assert_eq!(grants.len(), 2);
        assert!(grants.iter().all(|g| g.source == GrantSource::BirthdayRule && g.percent == 10));

        // 2024-06-10 WIB ends at 2024-06-10 17:00 UTC
        let midnight = end_of_store_day(h.clock_now(), h.config.store_offset());
        assert!(grants.iter().all(|g| g.expires_at == Some(midnight)));

        let decision = h.resolver.resolve(&budi.id, &semen.id, None).await.unwrap().unwrap();
        assert_eq!(decision.rule, DiscountRule::BirthdayLoyal);
        assert!(decision.grant_id.is_some());

        // Applies to every checkout that day
        let order_id = h
            .orders
            .submit(&budi.id, &[CartLine::new(&cat.id, 1)], "", None)
            .await
            .unwrap();
        let lines = h.db.orders().get_lines(&order_id).await.unwrap();
        assert_eq!(lines[0].discount_cents, Money::from_major(50_000).cents());

        // Gone after midnight
        h.clock.set(midnight);
        assert!(h.resolver.resolve(&budi.id, &semen.id, None).await.unwrap().is_none());
    }
}
