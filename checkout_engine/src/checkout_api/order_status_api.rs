//! The order status machine.
//!
//! ```text
//! pending -> confirmed -> shipped -> delivered -> completed
//!    |           |
//!    +-----------+--> cancelled
//! ```
//!
//! Every transition is written together with its history entry, any stock restoration or seller sales update, and the
//! outbox tasks for its notifications and earnings credit, in one transaction. Delivering those tasks is the outbox
//! dispatcher's job, so a failing notification never undoes a transition.
use std::fmt::Debug;

use campus_common::Rate;
use chrono::Utc;
use log::*;
use serde_json::json;

use crate::{
    checkout_api::{checkout_config::CheckoutConfig, errors::CheckoutError, order_objects::StatusUpdateRequest},
    db_types::{
        Actor,
        NewNotification,
        NotificationKind,
        Order,
        OrderId,
        OrderStatus,
        OrderStatusUpdate,
        SideEffect,
        StatusChange,
        StockMovement,
        UserId,
    },
    events::{EventProducers, OrderStatusChangedEvent},
    traits::OrderManagement,
};

/// The statuses an order may move to from `from`.
pub fn allowed_transitions(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        Pending => &[Confirmed, Cancelled],
        Confirmed => &[Shipped, Cancelled],
        Shipped => &[Delivered],
        Delivered => &[Completed],
        Completed | Cancelled => &[],
    }
}

pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

pub struct OrderStatusApi<B> {
    db: B,
    completion_fee_rate: Rate,
    producers: EventProducers,
}

impl<B> Debug for OrderStatusApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderStatusApi")
    }
}

impl<B> OrderStatusApi<B> {
    pub fn new(db: B, config: &CheckoutConfig, producers: EventProducers) -> Self {
        Self { db, completion_fee_rate: config.completion_fee_rate, producers }
    }
}

impl<B> OrderStatusApi<B>
where B: OrderManagement
{
    /// Moves an order to a new status on behalf of `actor`.
    ///
    /// The transition must be in the adjacency table. Buyers may only cancel, and only while the order is pending.
    /// Every other transition needs the order's seller or an admin. If the order changes status underneath this
    /// call, [`CheckoutError::OrderStatusChanged`] is returned and nothing is written.
    pub async fn update_status(
        &self,
        order_id: &OrderId,
        actor: &Actor,
        request: StatusUpdateRequest,
    ) -> Result<Order, CheckoutError> {
        let order = self.get_order(order_id, actor).await?;
        let from = order.status;
        let to = request.status;
        if !is_valid_transition(from, to) {
            debug!("🚦 {} tried to move order {order_id} from {from} to {to}", actor.id);
            return Err(CheckoutError::InvalidTransition { from, to });
        }
        authorize(&order, actor, to)?;
        let change = StatusChange { status: to, note: request.note, actor: actor.id.clone(), at: Utc::now() };
        let effects = side_effects_for(&order, to, actor, self.completion_fee_rate);
        let update = OrderStatusUpdate {
            order_id: order_id.clone(),
            from,
            to,
            change,
            restore_stock: to == OrderStatus::Cancelled,
            record_sale: to == OrderStatus::Completed,
        };
        let updated = self.db.apply_status_change(update, effects).await?;
        info!("🚦 Order {order_id} moved from {from} to {to} by {}", actor.id);
        let event = OrderStatusChangedEvent::new(updated.clone(), from, actor.id.clone());
        self.producers.publish_status_changed(event).await;
        Ok(updated)
    }

    pub async fn cancel(&self, order_id: &OrderId, actor: &Actor, reason: Option<String>) -> Result<Order, CheckoutError> {
        self.update_status(order_id, actor, StatusUpdateRequest { status: OrderStatus::Cancelled, note: reason }).await
    }

    /// Fetches an order. Only the buyer, the seller and admins may see it.
    pub async fn get_order(&self, order_id: &OrderId, actor: &Actor) -> Result<Order, CheckoutError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| CheckoutError::OrderNotFound(order_id.clone()))?;
        if !actor.is_admin() && !order.is_party(&actor.id) {
            warn!("🚦 {} tried to access order {order_id} but is neither its buyer nor its seller", actor.id);
            return Err(CheckoutError::Forbidden("You are not a party to this order".into()));
        }
        Ok(order)
    }

    pub async fn orders_for_buyer(
        &self,
        buyer_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, CheckoutError> {
        Ok(self.db.fetch_orders_for_buyer(buyer_id, status).await?)
    }

    pub async fn orders_for_seller(
        &self,
        seller_id: &UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, CheckoutError> {
        Ok(self.db.fetch_orders_for_seller(seller_id, status).await?)
    }

    pub async fn stock_movements(&self, order_id: &OrderId, actor: &Actor) -> Result<Vec<StockMovement>, CheckoutError> {
        let order = self.get_order(order_id, actor).await?;
        Ok(self.db.fetch_stock_movements(&order.id).await?)
    }
}

fn authorize(order: &Order, actor: &Actor, to: OrderStatus) -> Result<(), CheckoutError> {
    if actor.is_admin() || order.seller_id() == &actor.id {
        return Ok(());
    }
    match (to, order.status) {
        (OrderStatus::Cancelled, OrderStatus::Pending) => Ok(()),
        (OrderStatus::Cancelled, _) => {
            Err(CheckoutError::Forbidden("Buyers can only cancel orders that are still pending".into()))
        },
        _ => Err(CheckoutError::Forbidden(format!("Only the seller can mark an order as {to}"))),
    }
}

/// The outbox tasks a transition produces.
pub fn side_effects_for(order: &Order, to: OrderStatus, actor: &Actor, completion_fee_rate: Rate) -> Vec<SideEffect> {
    let data = json!({ "order_id": order.id, "status": to });
    let notify = |user: &UserId, kind: NotificationKind, title: &str, message: String| {
        SideEffect::Notify(NewNotification::new(user.clone(), kind, title.to_string(), message).with_data(data.clone()))
    };
    let buyer = order.buyer_id();
    let seller = order.seller_id();
    match to {
        OrderStatus::Pending => vec![],
        OrderStatus::Confirmed => vec![notify(
            buyer,
            NotificationKind::OrderConfirmed,
            "Order confirmed",
            format!("{} has confirmed your order {}", order.seller.name, order.id),
        )],
        OrderStatus::Shipped => vec![notify(
            buyer,
            NotificationKind::OrderShipped,
            "Order on its way",
            format!("Your order {} from {} is on its way", order.id, order.seller.name),
        )],
        OrderStatus::Delivered => vec![notify(
            buyer,
            NotificationKind::OrderDelivered,
            "Order delivered",
            format!("Your order {} has been delivered", order.id),
        )],
        OrderStatus::Completed => vec![
            SideEffect::CreditEarnings {
                seller_id: seller.clone(),
                order_id: order.id.clone(),
                gross: order.total,
                fee_rate: completion_fee_rate,
            },
            notify(
                seller,
                NotificationKind::OrderCompleted,
                "Order completed",
                format!("Order {} is complete. {} has been added to your earnings", order.id, order.total),
            ),
        ],
        OrderStatus::Cancelled => {
            let message = format!("Order {} has been cancelled", order.id);
            let mut recipients = Vec::with_capacity(2);
            if actor.is_admin() || &actor.id != buyer {
                recipients.push(buyer);
            }
            if actor.is_admin() || &actor.id != seller {
                recipients.push(seller);
            }
            recipients
                .into_iter()
                .map(|user| notify(user, NotificationKind::OrderCancelled, "Order cancelled", message.clone()))
                .collect()
        },
    }
}
