//! # Notification Sinks
//!
//! Where notification intents go once the state change behind them has
//! committed.
//!
//! ## Delivery Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderStateMachine / BirthdaySweep                                      │
//! │       │                                                                 │
//! │       │  tx.commit()                                                    │
//! │       ▼                                                                 │
//! │  deliver_all(sink, intents)                                            │
//! │       │                                                                 │
//! │       ├── OutboxNotificationSink → notifications table (prod)          │
//! │       └── MemoryNotificationSink → Vec in memory (tests, dry runs)     │
//! │                                                                         │
//! │  A failing sink is logged with warn! and never undoes the commit.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::FixedOffset;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::clock::SharedClock;
use crate::error::NotifyError;
use barokah_core::loyalty::store_date;
use barokah_core::NotificationIntent;
use barokah_db::NotificationRepository;

/// Receives notification intents.
#[async_trait]
pub trait NotificationSink: Send + Sync + Debug {
    async fn deliver(&self, intent: &NotificationIntent) -> Result<(), NotifyError>;
}

/// Shared handle used by the services.
pub type SharedSink = Arc<dyn NotificationSink>;

/// Hands every intent to the sink, logging failures.
///
/// ## Returns
/// The number of intents the sink accepted.
pub async fn deliver_all(sink: &dyn NotificationSink, intents: &[NotificationIntent]) -> usize {
    let mut delivered = 0;
    for intent in intents {
        match sink.deliver(intent).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!(
                customer_id = %intent.customer_id,
                category = ?intent.category,
                error = %e,
                "Notification delivery failed"
            ),
        }
    }
    delivered
}

// =============================================================================
// Outbox Sink
// =============================================================================

/// Persists intents into the notification outbox.
///
/// Birthday categories carry the store-local date as a dedupe key, so a
/// customer gets at most one birthday message per day however often the
/// sweep runs.
#[derive(Debug, Clone)]
pub struct OutboxNotificationSink {
    repo: NotificationRepository,
    clock: SharedClock,
    offset: FixedOffset,
}

impl OutboxNotificationSink {
    pub fn new(repo: NotificationRepository, clock: SharedClock, offset: FixedOffset) -> Self {
        OutboxNotificationSink { repo, clock, offset }
    }
}

#[async_trait]
impl NotificationSink for OutboxNotificationSink {
    async fn deliver(&self, intent: &NotificationIntent) -> Result<(), NotifyError> {
        let now = self.clock.now();
        let dedupe_day = intent
            .category
            .is_daily()
            .then(|| store_date(now, self.offset));

        let written = self.repo.enqueue(intent, dedupe_day, now).await?;
        if !written {
            debug!(customer_id = %intent.customer_id, category = ?intent.category, "Duplicate daily notification dropped");
        }
        Ok(())
    }
}

// =============================================================================
// Memory Sink
// =============================================================================

/// Collects intents in memory.
#[derive(Debug, Default)]
pub struct MemoryNotificationSink {
    delivered: Mutex<Vec<NotificationIntent>>,
}

impl MemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far.
    pub fn delivered(&self) -> Vec<NotificationIntent> {
        self.delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drains and returns everything delivered so far.
    pub fn take(&self) -> Vec<NotificationIntent> {
        std::mem::take(&mut *self.delivered.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

#[async_trait]
impl NotificationSink for MemoryNotificationSink {
    async fn deliver(&self, intent: &NotificationIntent) -> Result<(), NotifyError> {
        self.delivered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(intent.clone());
        Ok(())
    }
}
