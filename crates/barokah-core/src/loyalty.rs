//! # Loyalty Rules
//!
//! Pure rules behind the birthday promotions: loyalty status, birthday
//! detection in the store's calendar, and top-purchased ranking.
//!
//! ## Who Gets What On Their Birthday
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  qualifying spend = Σ total of PAID / SHIPPED / COMPLETED orders        │
//! │                                                                         │
//! │  spend ≥ Rp 5.000.000  → LOYAL                                          │
//! │     └─ 10% on their 3 most-purchased products, today only   (P2-A)     │
//! │                                                                         │
//! │  spend <  Rp 5.000.000 → NOT LOYAL                                      │
//! │     └─ 10% on every line if the cart reaches Rp 5.000.000    (P2-B)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::HashMap;

use crate::money::Money;

/// Qualifying spend at which a customer becomes loyal (Rp 5.000.000).
pub const LOYALTY_THRESHOLD: Money = Money::from_major(5_000_000);

/// Pre-discount cart total that unlocks the conditional birthday discount.
pub const CONDITIONAL_CART_THRESHOLD: Money = Money::from_major(5_000_000);

/// Percent granted by both birthday rules.
pub const BIRTHDAY_DISCOUNT_PERCENT: u32 = 10;

/// How many favourite products the loyal birthday discount covers.
pub const TOP_PRODUCTS_LIMIT: usize = 3;

/// Loyal iff qualifying spend reaches the threshold.
pub fn is_loyal(qualifying_spend: Money, threshold: Money) -> bool {
    qualifying_spend >= threshold
}

/// Month/day match between a birth date and the store's current date.
///
/// A 29 February birthday is celebrated on 28 February in non-leap years.
pub fn is_birthday(birth_date: NaiveDate, today: NaiveDate) -> bool {
    if birth_date.month() == today.month() && birth_date.day() == today.day() {
        return true;
    }

    let leap_day_birthday = birth_date.month() == 2 && birth_date.day() == 29;
    let non_leap_year = NaiveDate::from_ymd_opt(today.year(), 2, 29).is_none();
    leap_day_birthday && non_leap_year && today.month() == 2 && today.day() == 28
}

/// Ranks products by total purchased quantity, descending.
///
/// Ties are broken by product id ascending so the ranking is deterministic.
/// Duplicate product ids in the input are summed.
pub fn rank_top_products<I>(purchases: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = (String, i64)>,
{
    let mut totals: HashMap<String, i64> = HashMap::new();
    for (product_id, quantity) in purchases {
        *totals.entry(product_id).or_insert(0) += quantity;
    }

    let mut ranked: Vec<(String, i64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(id, _)| id).collect()
}

// =============================================================================
// Store Calendar
// =============================================================================

/// The store's calendar date at instant `now`.
pub fn store_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// The next local midnight after `now`, as a UTC instant.
///
/// Birthday grants expire here: valid "for the current calendar day only".
pub fn end_of_store_day(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let tomorrow = store_date(now, offset) + Duration::days(1);
    let local_midnight = tomorrow.and_time(NaiveTime::MIN);
    let utc_naive = local_midnight - Duration::seconds(offset.local_minus_utc() as i64);
    Utc.from_utc_datetime(&utc_naive)
}

// =============================================================================
// Snapshot
// =============================================================================

/// One consistent view of a customer's loyalty state, taken once per
/// resolve pass so every cart line is priced against the same facts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoyaltySnapshot {
    pub customer_id: String,
    pub qualifying_spend: Money,
    pub is_loyal: bool,
    pub is_birthday_today: bool,
    /// Ranked favourite product ids, at most `TOP_PRODUCTS_LIMIT` long.
    pub top_products: Vec<String>,
}

impl LoyaltySnapshot {
    /// Birthday today and loyal: P2-A applies to top products.
    pub fn qualifies_birthday_loyal(&self) -> bool {
        self.is_birthday_today && self.is_loyal
    }

    /// Birthday today and not loyal: P2-B may apply depending on cart total.
    pub fn qualifies_birthday_conditional(&self) -> bool {
        self.is_birthday_today && !self.is_loyal
    }

    pub fn is_top_product(&self, product_id: &str) -> bool {
        self.top_products.iter().any(|id| id == product_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn jakarta() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn test_loyalty_threshold_is_inclusive() {
        assert!(is_loyal(Money::from_major(5_000_000), LOYALTY_THRESHOLD));
        assert!(!is_loyal(Money::from_major(4_999_999), LOYALTY_THRESHOLD));
        assert!(is_loyal(Money::from_major(6_000_000), LOYALTY_THRESHOLD));
    }

    #[test]
    fn test_birthday_ignores_year() {
        assert!(is_birthday(date(1990, 6, 1), date(2024, 6, 1)));
        assert!(!is_birthday(date(1990, 6, 1), date(2024, 6, 2)));
    }

    #[test]
    fn test_leap_day_birthday() {
        assert!(is_birthday(date(2000, 2, 29), date(2024, 2, 29)));
        assert!(!is_birthday(date(2000, 2, 29), date(2024, 2, 28)));
        assert!(is_birthday(date(2000, 2, 29), date(2023, 2, 28)));
        assert!(!is_birthday(date(2000, 2, 28), date(2023, 3, 1)));
    }

    #[test]
    fn test_rank_top_products_orders_by_quantity_then_id() {
        let purchases = vec![
            ("bata".to_string(), 500),
            ("semen".to_string(), 20),
            ("cat".to_string(), 20),
            ("pasir".to_string(), 3),
            ("semen".to_string(), 10),
        ];

        let top = rank_top_products(purchases, 3);
        assert_eq!(top, vec!["bata", "semen", "cat"]);
    }

    #[test]
    fn test_rank_top_products_tie_breaks_by_id() {
        let purchases = vec![
            ("p3".to_string(), 5),
            ("p1".to_string(), 5),
            ("p2".to_string(), 5),
            ("p4".to_string(), 5),
        ];
        assert_eq!(rank_top_products(purchases, 3), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_store_date_uses_offset() {
        // 2024-05-31 18:30 UTC is already 1 June in Jakarta
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 18, 30, 0).unwrap();
        assert_eq!(store_date(now, jakarta()), date(2024, 6, 1));
        assert_eq!(store_date(now, FixedOffset::east_opt(0).unwrap()), date(2024, 5, 31));
    }

    #[test]
    fn test_end_of_store_day() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap();
        // Local midnight 2 June 00:00 +07:00 = 1 June 17:00 UTC
        assert_eq!(
            end_of_store_day(now, jakarta()),
            Utc.with_ymd_and_hms(2024, 6, 1, 17, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_snapshot_predicates() {
        let snapshot = LoyaltySnapshot {
            customer_id: "c1".to_string(),
            qualifying_spend: Money::from_major(6_000_000),
            is_loyal: true,
            is_birthday_today: true,
            top_products: vec!["p1".to_string()],
        };
        assert!(snapshot.qualifies_birthday_loyal());
        assert!(!snapshot.qualifies_birthday_conditional());
        assert!(snapshot.is_top_product("p1"));
        assert!(!snapshot.is_top_product("p2"));
    }
}
