//! # Order Lifecycle Rules
//!
//! The order state graph and the stock effect of every legal move.
//!
//! ## Stock-Committed Group
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  { PROCESSING, PAID, SHIPPED }  ← an order here holds a stock debit    │
//! │                                                                         │
//! │  enter group, not yet debited   → DEBIT every line   (committed=true)  │
//! │  enter CANCELLED while debited  → CREDIT every line  (committed=false) │
//! │  any other move                 → no stock movement                    │
//! │                                                                         │
//! │  COMPLETED keeps the debit: delivered goods never return to stock.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `stock_committed` flag on the order is what makes debit and credit
//! happen exactly once, no matter how many times a status is re-applied or
//! which path (admin, customer, expiry) triggers the move.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::OrderStatus;

impl OrderStatus {
    /// True for statuses that hold reserved inventory.
    pub fn holds_stock(&self) -> bool {
        matches!(
            self,
            OrderStatus::Processing | OrderStatus::Paid | OrderStatus::Shipped
        )
    }

    /// True for statuses whose total counts toward loyalty spend and
    /// top-purchased ranking.
    pub fn counts_as_purchase(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Shipped | OrderStatus::Completed
        )
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Checks the state graph.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Processing, Paid)
                | (Processing, Cancelled)
                | (Paid, Shipped)
                | (Paid, Cancelled)
                | (Shipped, Completed)
                | (Shipped, Cancelled)
        )
    }

    /// Statuses an order may be created in directly by an admin.
    pub fn is_valid_initial(&self) -> bool {
        !matches!(self, OrderStatus::Cancelled)
    }
}

// =============================================================================
// Actor
// =============================================================================

/// Who requested a status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Customer(String),
    Admin(String),
    /// Scheduled jobs (payment expiry).
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Customer(id) => write!(f, "customer:{}", id),
            Actor::Admin(id) => write!(f, "admin:{}", id),
            Actor::System => f.write_str("system"),
        }
    }
}

// =============================================================================
// Transition Plan
// =============================================================================

/// Inventory movement required by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    None,
    /// Debit every line quantity.
    Debit,
    /// Credit every line quantity back.
    Credit,
}

/// The validated outcome of a requested status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub stock_effect: StockEffect,
    /// Value of the order's `stock_committed` flag after the move.
    pub stock_committed_after: bool,
}

/// Decides whether `from → to` is legal and which stock movement it needs.
///
/// ## Example
/// ```rust
/// use barokah_core::lifecycle::{plan_transition, StockEffect};
/// use barokah_core::OrderStatus;
///
/// let plan = plan_transition(OrderStatus::Paid, OrderStatus::Cancelled, true).unwrap();
/// assert_eq!(plan.stock_effect, StockEffect::Credit);
/// assert!(!plan.stock_committed_after);
/// ```
pub fn plan_transition(
    from: OrderStatus,
    to: OrderStatus,
    stock_committed: bool,
) -> CoreResult<TransitionPlan> {
    if !from.can_transition_to(to) {
        return Err(CoreError::IllegalTransition { from, to });
    }

    let stock_effect = stock_effect_for(to, stock_committed);
    let stock_committed_after = match stock_effect {
        StockEffect::Debit => true,
        StockEffect::Credit => false,
        StockEffect::None => stock_committed,
    };

    Ok(TransitionPlan {
        from,
        to,
        stock_effect,
        stock_committed_after,
    })
}

/// Stock movement for arriving in `status` given the current debit state.
///
/// Also used when an admin creates an order directly in some status.
pub fn stock_effect_for(status: OrderStatus, stock_committed: bool) -> StockEffect {
    if status.holds_stock() && !stock_committed {
        StockEffect::Debit
    } else if status == OrderStatus::Cancelled && stock_committed {
        StockEffect::Credit
    } else {
        StockEffect::None
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn test_graph_edges() {
        let legal = [
            (Processing, Paid),
            (Processing, Cancelled),
            (Paid, Shipped),
            (Paid, Cancelled),
            (Shipped, Completed),
            (Shipped, Cancelled),
        ];

        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for to in OrderStatus::ALL {
            assert!(plan_transition(Completed, to, true).is_err());
            assert!(plan_transition(Cancelled, to, false).is_err());
        }
    }

    #[test]
    fn test_illegal_transition_error() {
        let err = plan_transition(Processing, Shipped, true).unwrap_err();
        assert!(matches!(
            err,
            CoreError::IllegalTransition {
                from: Processing,
                to: Shipped
            }
        ));
    }

    #[test]
    fn test_cancel_credits_only_when_committed() {
        let plan = plan_transition(Shipped, Cancelled, true).unwrap();
        assert_eq!(plan.stock_effect, StockEffect::Credit);
        assert!(!plan.stock_committed_after);

        let plan = plan_transition(Paid, Cancelled, false).unwrap();
        assert_eq!(plan.stock_effect, StockEffect::None);
        assert!(!plan.stock_committed_after);
    }

    #[test]
    fn test_moves_inside_group_do_not_touch_stock() {
        let plan = plan_transition(Processing, Paid, true).unwrap();
        assert_eq!(plan.stock_effect, StockEffect::None);
        assert!(plan.stock_committed_after);

        let plan = plan_transition(Shipped, Completed, true).unwrap();
        assert_eq!(plan.stock_effect, StockEffect::None);
        assert!(plan.stock_committed_after);
    }

    #[test]
    fn test_entering_group_without_debit_debits() {
        let plan = plan_transition(Processing, Paid, false).unwrap();
        assert_eq!(plan.stock_effect, StockEffect::Debit);
        assert!(plan.stock_committed_after);
    }

    #[test]
    fn test_stock_effect_for_initial_status() {
        assert_eq!(stock_effect_for(Processing, false), StockEffect::Debit);
        assert_eq!(stock_effect_for(Shipped, false), StockEffect::Debit);
        assert_eq!(stock_effect_for(Completed, false), StockEffect::None);
    }

    #[test]
    fn test_purchase_statuses() {
        assert!(!Processing.counts_as_purchase());
        assert!(Paid.counts_as_purchase());
        assert!(Shipped.counts_as_purchase());
        assert!(Completed.counts_as_purchase());
        assert!(!Cancelled.counts_as_purchase());
    }

    #[test]
    fn test_actor_display() {
        assert_eq!(Actor::Admin("a1".into()).to_string(), "admin:a1");
        assert_eq!(Actor::System.to_string(), "system");
    }
}
