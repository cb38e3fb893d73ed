use std::{fmt::Display, str::FromStr};

use campus_common::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;

use super::{
    ConversionError,
    DeliveryAddress,
    DeliveryMethod,
    ListingId,
    ListingType,
    OrderId,
    PaymentMethod,
    SessionId,
    UserId,
    UserProfile,
    VariantId,
    VariantSnapshot,
};

//--------------------------------------      OrderStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Confirmed => write!(f, "confirmed"),
            OrderStatus::Shipped => write!(f, "shipped"),
            OrderStatus::Delivered => write!(f, "delivered"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub paid_at: DateTime<Utc>,
    pub transaction_ref: String,
}

//--------------------------------------     PartySnapshot     ---------------------------------------------------------
/// Contact details of a buyer or seller, frozen when the order is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySnapshot {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl PartySnapshot {
    pub fn buyer(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.username.clone().unwrap_or_else(|| profile.display_name.clone()),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
        }
    }

    pub fn seller(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.display_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
        }
    }
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub listing_id: ListingId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub item_type: ListingType,
    pub variant: Option<VariantSnapshot>,
    pub image: Option<String>,
    pub line_total: Money,
}

impl OrderItem {
    pub fn variant_id(&self) -> Option<&VariantId> {
        self.variant.as_ref().map(|v| &v.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub note: Option<String>,
    pub actor: UserId,
    pub at: DateTime<Utc>,
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub session_id: Option<SessionId>,
    pub buyer: PartySnapshot,
    pub seller: PartySnapshot,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_details: Option<PaymentDetails>,
    pub delivery_method: DeliveryMethod,
    pub delivery_address: DeliveryAddress,
    pub status: OrderStatus,
    pub history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn buyer_id(&self) -> &UserId {
        &self.buyer.id
    }

    pub fn seller_id(&self) -> &UserId {
        &self.seller.id
    }

    pub fn is_party(&self, user: &UserId) -> bool {
        &self.buyer.id == user || &self.seller.id == user
    }

    pub fn listing_ids(&self) -> Vec<ListingId> {
        self.items.iter().map(|i| i.listing_id.clone()).collect()
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub session_id: Option<SessionId>,
    pub buyer: PartySnapshot,
    pub seller: PartySnapshot,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_details: Option<PaymentDetails>,
    pub delivery_method: DeliveryMethod,
    pub delivery_address: DeliveryAddress,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn initial_history(&self) -> Vec<StatusChange> {
        vec![StatusChange {
            status: OrderStatus::Pending,
            note: Some("Order placed".to_string()),
            actor: self.buyer.id.clone(),
            at: self.created_at,
        }]
    }
}

/// A status update that is only applied if the order is still in `from`.
#[derive(Debug, Clone)]
pub struct OrderStatusUpdate {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub change: StatusChange,
    /// Restore stock for the order's product items in the same transaction.
    pub restore_stock: bool,
    /// Add the order total to the seller's revenue and sales counters in the same transaction.
    pub record_sale: bool,
}
