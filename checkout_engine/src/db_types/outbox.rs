use std::fmt::Display;

use campus_common::{Money, Rate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, Type};

use super::{OrderId, UserId};

//--------------------------------------     Notifications     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    OrderConfirmed,
    OrderShipped,
    OrderDelivered,
    OrderCompleted,
    OrderCancelled,
}

impl Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::NewOrder => write!(f, "new_order"),
            NotificationKind::OrderConfirmed => write!(f, "order_confirmed"),
            NotificationKind::OrderShipped => write!(f, "order_shipped"),
            NotificationKind::OrderDelivered => write!(f, "order_delivered"),
            NotificationKind::OrderCompleted => write!(f, "order_completed"),
            NotificationKind::OrderCancelled => write!(f, "order_cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: Value,
}

impl NewNotification {
    pub fn new<S: Into<String>>(user_id: UserId, kind: NotificationKind, title: S, message: S) -> Self {
        Self { user_id, kind, title: title.into(), message: message.into(), data: Value::Null }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Earnings        ---------------------------------------------------------
/// A seller earnings ledger entry. There is at most one entry per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EarningsEntry {
    pub id: i64,
    pub seller_id: UserId,
    pub order_id: OrderId,
    pub gross: Money,
    pub fee_rate: Rate,
    pub platform_fee: Money,
    pub net: Money,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Outbox         ---------------------------------------------------------
/// A side effect of an order state change. Side effects are written to the outbox in the same transaction as the
/// state change and delivered at least once by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    Notify(NewNotification),
    CreditEarnings { seller_id: UserId, order_id: OrderId, gross: Money, fee_rate: Rate },
}

impl SideEffect {
    pub fn name(&self) -> &'static str {
        match self {
            SideEffect::Notify(_) => "notify",
            SideEffect::CreditEarnings { .. } => "credit_earnings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxTask {
    pub id: i64,
    pub effect: SideEffect,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OutboxTask {
    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }
}
