use crate::{db_types::OutboxTask, traits::StoreError};

/// Access to the queue of side effects that still need to be delivered.
#[allow(async_fn_in_trait)]
pub trait OutboxManagement: Clone {
    /// Undelivered tasks with fewer than `max_attempts` attempts, oldest first.
    async fn fetch_pending_tasks(&self, limit: i64, max_attempts: i64) -> Result<Vec<OutboxTask>, StoreError>;

    async fn mark_task_delivered(&self, id: i64) -> Result<(), StoreError>;

    /// Bumps the attempt counter and records the error.
    async fn record_task_failure(&self, id: i64, error: &str) -> Result<(), StoreError>;

    async fn fetch_outbox_task(&self, id: i64) -> Result<Option<OutboxTask>, StoreError>;
}
