use serde::{Deserialize, Serialize};

use crate::db_types::{CheckoutSession, Order, OrderStatus, UserId};

/// Emitted once for every order that is persisted, including orders from a partially successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub order: Order,
    pub old_status: OrderStatus,
    pub changed_by: UserId,
}

impl OrderStatusChangedEvent {
    pub fn new(order: Order, old_status: OrderStatus, changed_by: UserId) -> Self {
        Self { order, old_status, changed_by }
    }

    pub fn new_status(&self) -> OrderStatus {
        self.order.status
    }
}

/// Emitted when a checkout session completes. `failed_sellers` lists the sellers whose order could not be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutCompletedEvent {
    pub session: CheckoutSession,
    pub failed_sellers: Vec<UserId>,
}
