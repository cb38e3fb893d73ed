use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatus, OrderStatusUpdate, SideEffect, StockMovement, UserId},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Persists an order and takes its stock, atomically.
    ///
    /// In one transaction:
    /// * the order is inserted in `pending`,
    /// * each product item's stock (or variant stock) is decremented with a guarded update that only succeeds if
    ///   enough stock is left,
    /// * a stock movement is recorded per decrement,
    /// * `effects` are queued in the outbox.
    ///
    /// If any decrement fails, nothing is written and [`StoreError::InsufficientStock`] names the item.
    async fn create_order_with_stock(&self, order: NewOrder, effects: Vec<SideEffect>) -> Result<Order, StoreError>;

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// A buyer's orders, newest first.
    async fn fetch_orders_for_buyer(
        &self,
        buyer_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, StoreError>;

    /// A seller's orders, newest first.
    async fn fetch_orders_for_seller(
        &self,
        seller_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, StoreError>;

    /// Applies a status change, atomically with its storage-level consequences.
    ///
    /// The change only applies if the order is still in `update.from`; otherwise
    /// [`StoreError::OrderStatusChanged`] is returned and nothing is written. In the same transaction, stock is
    /// restored (if `update.restore_stock`), the seller's sales metrics are updated (if `update.record_sale`) and
    /// `effects` are queued in the outbox.
    async fn apply_status_change(
        &self,
        update: OrderStatusUpdate,
        effects: Vec<SideEffect>,
    ) -> Result<Order, StoreError>;

    async fn fetch_stock_movements(&self, order_id: &OrderId) -> Result<Vec<StockMovement>, StoreError>;
}
