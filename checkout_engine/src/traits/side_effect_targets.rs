use campus_common::{Money, Rate};

use crate::{
    db_types::{EarningsEntry, NewNotification, Notification, OrderId, UserId},
    traits::StoreError,
};

/// Delivers user notifications.
#[allow(async_fn_in_trait)]
pub trait NotificationDispatch: Clone {
    async fn notify(&self, notification: &NewNotification) -> Result<(), StoreError>;

    /// Notifications for a user, newest first.
    async fn fetch_notifications(&self, user_id: &UserId) -> Result<Vec<Notification>, StoreError>;
}

/// The seller earnings ledger.
///
/// `credit_earnings` must be idempotent per order: crediting the same order twice returns the original entry and
/// does not double-count.
#[allow(async_fn_in_trait)]
pub trait EarningsLedger: Clone {
    async fn credit_earnings(
        &self,
        seller_id: &UserId,
        order_id: &OrderId,
        gross: Money,
        fee_rate: Rate,
    ) -> Result<EarningsEntry, StoreError>;

    async fn fetch_earnings(&self, seller_id: &UserId) -> Result<Vec<EarningsEntry>, StoreError>;
}
