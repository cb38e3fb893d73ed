//! Delivery of outbox tasks.
//!
//! Side effects of order transitions are queued in the outbox in the same transaction as the transition itself. The
//! dispatcher picks up undelivered tasks and hands them to their targets. Delivery is at least once: a task that
//! fails stays in the outbox with its attempt counter bumped and is retried on the next run, until it runs out of
//! attempts. Targets must therefore tolerate repeats. The earnings ledger is idempotent per order for this reason.
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{OutboxTask, SideEffect},
    traits::{EarningsLedger, NotificationDispatch, OutboxManagement, StoreError},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub failed: usize,
}

impl DispatchSummary {
    pub fn is_idle(&self) -> bool {
        self.delivered == 0 && self.failed == 0
    }
}

#[derive(Clone)]
pub struct SideEffectDispatcher<B, N, L> {
    outbox: B,
    notifier: N,
    ledger: L,
    max_attempts: i64,
}

impl<B, N, L> SideEffectDispatcher<B, N, L>
where
    B: OutboxManagement,
    N: NotificationDispatch,
    L: EarningsLedger,
{
    pub fn new(outbox: B, notifier: N, ledger: L, max_attempts: i64) -> Self {
        Self { outbox, notifier, ledger, max_attempts }
    }

    /// Attempts delivery of up to `limit` pending tasks, oldest first.
    pub async fn run_once(&self, limit: i64) -> Result<DispatchSummary, StoreError> {
        let tasks = self.outbox.fetch_pending_tasks(limit, self.max_attempts).await?;
        let mut summary = DispatchSummary::default();
        for task in tasks {
            match self.deliver(&task.effect).await {
                Ok(()) => {
                    self.outbox.mark_task_delivered(task.id).await?;
                    trace!("📬️ Outbox task #{} ({}) delivered", task.id, task.effect.name());
                    summary.delivered += 1;
                },
                Err(e) => {
                    self.outbox.record_task_failure(task.id, &e.to_string()).await?;
                    self.log_failure(&task, &e);
                    summary.failed += 1;
                },
            }
        }
        if !summary.is_idle() {
            debug!("📬️ Outbox run complete. {} delivered, {} failed", summary.delivered, summary.failed);
        }
        Ok(summary)
    }

    async fn deliver(&self, effect: &SideEffect) -> Result<(), StoreError> {
        match effect {
            SideEffect::Notify(notification) => self.notifier.notify(notification).await,
            SideEffect::CreditEarnings { seller_id, order_id, gross, fee_rate } => {
                let entry = self.ledger.credit_earnings(seller_id, order_id, *gross, *fee_rate).await?;
                debug!("📬️ Seller {seller_id} credited {} for order {order_id}", entry.net);
                Ok(())
            },
        }
    }

    fn log_failure(&self, task: &OutboxTask, error: &StoreError) {
        let attempts = task.attempts + 1;
        if attempts >= self.max_attempts {
            error!(
                "📬️ Giving up on outbox task #{} ({}) after {attempts} attempts. Last error: {error}",
                task.id,
                task.effect.name()
            );
        } else {
            warn!("📬️ Outbox task #{} ({}) failed on attempt {attempts}: {error}", task.id, task.effect.name());
        }
    }
}
