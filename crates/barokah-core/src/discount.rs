//! # Discount Resolution
//!
//! Decides which single discount applies to one product for one customer.
//!
//! ## Priority (first match wins, never stacked)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Manual product grant    ACTIVE, unexpired, product = this product  │
//! │  2. Manual general grant    ACTIVE, unexpired, no product              │
//! │  3. Birthday loyal (P2-A)   birthday ∧ loyal ∧ product ∈ top-3          │
//! │  4. Birthday cond. (P2-B)   birthday ∧ ¬loyal ∧ cart ≥ Rp 5.000.000     │
//! │  5. None                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is pure: grants, loyalty facts and "now" are inputs, so
//! the same inputs always produce the same decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::loyalty::{
    LoyaltySnapshot, BIRTHDAY_DISCOUNT_PERCENT, CONDITIONAL_CART_THRESHOLD,
};
use crate::money::Money;
use crate::types::{DiscountGrant, GrantSource};

pub const LABEL_BIRTHDAY_LOYAL: &str = "birthday loyalty discount";
pub const LABEL_BIRTHDAY_CONDITIONAL: &str = "birthday conditional discount";
pub const LABEL_MANUAL_DEFAULT: &str = "special discount";

// =============================================================================
// Decision
// =============================================================================

/// Which rule produced a discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountRule {
    ManualProduct,
    ManualGeneral,
    BirthdayLoyal,
    BirthdayConditional,
}

/// The discount applied to one product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountDecision {
    pub percent: u32,
    pub label: String,
    pub rule: DiscountRule,
    /// Backing grant, when the decision came from a stored grant.
    pub grant_id: Option<String>,
}

impl DiscountDecision {
    fn from_grant(grant: &DiscountGrant, rule: DiscountRule) -> Self {
        let label = match grant.source {
            GrantSource::BirthdayRule => LABEL_BIRTHDAY_LOYAL.to_string(),
            GrantSource::Admin if grant.message.trim().is_empty() => {
                LABEL_MANUAL_DEFAULT.to_string()
            }
            GrantSource::Admin => grant.message.clone(),
        };

        DiscountDecision {
            percent: grant.percent,
            label,
            rule,
            grant_id: Some(grant.id.clone()),
        }
    }

    /// Discount amount for a line worth `gross`.
    pub fn amount_for(&self, gross: Money) -> Money {
        gross.percentage_discount(self.percent)
    }
}

// =============================================================================
// Policy
// =============================================================================

/// How the loyal birthday discount (P2-A) is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BirthdayDiscountMode {
    /// Recomputed from loyalty facts on every resolve call.
    #[default]
    PerResolve,
    /// Persisted as BIRTHDAY_RULE grants by the daily sweep.
    Materialized,
}

/// Tunable promotion parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionPolicy {
    pub birthday_percent: u32,
    pub conditional_cart_threshold: Money,
    pub birthday_mode: BirthdayDiscountMode,
}

impl Default for PromotionPolicy {
    fn default() -> Self {
        PromotionPolicy {
            birthday_percent: BIRTHDAY_DISCOUNT_PERCENT,
            conditional_cart_threshold: CONDITIONAL_CART_THRESHOLD,
            birthday_mode: BirthdayDiscountMode::default(),
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Everything the resolver needs about one customer at one instant.
#[derive(Debug, Clone, Copy)]
pub struct DiscountContext<'a> {
    /// The customer's grants (any status; filtered here).
    pub grants: &'a [DiscountGrant],
    pub loyalty: &'a LoyaltySnapshot,
    pub policy: &'a PromotionPolicy,
    pub now: DateTime<Utc>,
}

impl<'a> DiscountContext<'a> {
    /// Resolves the discount for `product_id`.
    ///
    /// `cart_total` is the pre-discount total of the whole cart. When it is
    /// `None` the conditional birthday rule is skipped.
    pub fn resolve(&self, product_id: &str, cart_total: Option<Money>) -> Option<DiscountDecision> {
        if let Some(grant) = self.best_admin_grant(|g| g.product_id.as_deref() == Some(product_id)) {
            return Some(DiscountDecision::from_grant(grant, DiscountRule::ManualProduct));
        }

        if let Some(grant) = self.best_admin_grant(DiscountGrant::is_general) {
            return Some(DiscountDecision::from_grant(grant, DiscountRule::ManualGeneral));
        }

        if self.loyalty.qualifies_birthday_loyal() {
            match self.policy.birthday_mode {
                BirthdayDiscountMode::PerResolve if self.loyalty.is_top_product(product_id) => {
                    return Some(DiscountDecision {
                        percent: self.policy.birthday_percent,
                        label: LABEL_BIRTHDAY_LOYAL.to_string(),
                        rule: DiscountRule::BirthdayLoyal,
                        grant_id: None,
                    });
                }
                BirthdayDiscountMode::Materialized => {
                    if let Some(grant) = self.best_grant(|g| {
                        g.source == GrantSource::BirthdayRule
                            && g.product_id.as_deref() == Some(product_id)
                    }) {
                        return Some(DiscountDecision::from_grant(grant, DiscountRule::BirthdayLoyal));
                    }
                }
                BirthdayDiscountMode::PerResolve => {}
            }
        }

        if self.loyalty.qualifies_birthday_conditional() {
            if let Some(total) = cart_total {
                if total >= self.policy.conditional_cart_threshold {
                    return Some(DiscountDecision {
                        percent: self.policy.birthday_percent,
                        label: LABEL_BIRTHDAY_CONDITIONAL.to_string(),
                        rule: DiscountRule::BirthdayConditional,
                        grant_id: None,
                    });
                }
            }
        }

        None
    }

    fn best_admin_grant<F>(&self, scope: F) -> Option<&'a DiscountGrant>
    where
        F: Fn(&DiscountGrant) -> bool,
    {
        self.best_grant(|g| g.source == GrantSource::Admin && scope(g))
    }

    /// Most recently created effective grant matching `filter`; the higher
    /// id wins when two share a timestamp.
    fn best_grant<F>(&self, filter: F) -> Option<&'a DiscountGrant>
    where
        F: Fn(&DiscountGrant) -> bool,
    {
        self.grants
            .iter()
            .filter(|g| g.customer_id == self.loyalty.customer_id)
            .filter(|g| g.is_effective(self.now))
            .filter(|&g| filter(g))
            .max_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
