use std::{collections::BTreeSet, fmt::Display, str::FromStr};

use campus_common::{Money, Rate};
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
    VariantId,
    VariantSnapshot,
};
use crate::fees::FeeTier;

//--------------------------------------     SessionStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The session is open and its delivery and payment details may be changed.
    Pending,
    /// A payment intent exists for the session total. Pricing is frozen.
    PaymentIntentCreated,
    /// Orders are being created from the session.
    Processing,
    Completed,
    Cancelled,
    Expired,
}

impl SessionStatus {
    pub const NON_TERMINAL: [SessionStatus; 3] =
        [SessionStatus::Pending, SessionStatus::PaymentIntentCreated, SessionStatus::Processing];

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled | SessionStatus::Expired)
    }
}

impl Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::PaymentIntentCreated => write!(f, "payment_intent_created"),
            SessionStatus::Processing => write!(f, "processing"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
            SessionStatus::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "payment_intent_created" => Ok(Self::PaymentIntentCreated),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            s => Err(ConversionError(format!("Invalid session status: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Cart,
    Direct,
}

//--------------------------------------      SessionItem      ---------------------------------------------------------
/// A line item in a checkout session. Name and price are snapshots taken when the session was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionItem {
    pub listing_id: ListingId,
    pub seller_id: UserId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub item_type: ListingType,
    pub variant: Option<VariantSnapshot>,
    pub image: Option<String>,
}

impl SessionItem {
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }

    pub fn variant_id(&self) -> Option<&VariantId> {
        self.variant.as_ref().map(|v| &v.id)
    }
}

//--------------------------------------      SellerGroup      ---------------------------------------------------------
/// The part of a session that belongs to one seller, with its own fee breakdown.
///
/// `seller_receives == total_amount - platform_fee - processor_fee`, floored at zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerGroup {
    pub seller_id: UserId,
    pub seller_name: String,
    pub items: Vec<SessionItem>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub platform_fee: Money,
    pub platform_fee_rate: Rate,
    pub processor_fee: Money,
    pub total_amount: Money,
    pub seller_receives: Money,
    pub tier: FeeTier,
    pub allow_online_payment: bool,
}

impl SellerGroup {
    pub fn listing_ids(&self) -> Vec<ListingId> {
        self.items.iter().map(|i| i.listing_id.clone()).collect()
    }
}

//--------------------------------------    SessionPricing     ---------------------------------------------------------
/// Aggregate pricing over all seller groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPricing {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub platform_fee: Money,
    pub processor_fee: Money,
    pub total: Money,
    pub seller_receives: Money,
}

impl SessionPricing {
    pub fn from_groups(groups: &[SellerGroup]) -> Self {
        groups.iter().fold(Self::default(), |mut acc, g| {
            acc.subtotal += g.subtotal;
            acc.delivery_fee += g.delivery_fee;
            acc.platform_fee += g.platform_fee;
            acc.processor_fee += g.processor_fee;
            acc.total += g.total_amount;
            acc.seller_receives += g.seller_receives;
            acc
        })
    }
}

//--------------------------------------   StockReservation    ---------------------------------------------------------
/// An advisory record of stock a session intends to consume.
///
/// Reservations do not exclude other buyers. Live stock only changes when an order is created, via an atomic guarded
/// decrement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReservation {
    pub listing_id: ListingId,
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
    pub reserved_at: DateTime<Utc>,
}

//--------------------------------------    CheckoutSession    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: SessionId,
    pub buyer_id: UserId,
    pub session_type: SessionType,
    pub items: Vec<SessionItem>,
    pub seller_groups: Vec<SellerGroup>,
    pub pricing: SessionPricing,
    pub delivery_method: Option<DeliveryMethod>,
    pub delivery_address: Option<DeliveryAddress>,
    pub payment_method: Option<PaymentMethod>,
    pub payment_intent_id: Option<String>,
    pub reservations: Vec<StockReservation>,
    pub status: SessionStatus,
    pub order_ids: Vec<OrderId>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CheckoutSession {
    /// True if the session is still open but its time box has elapsed.
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && now >= self.expires_at
    }

    pub fn is_online_payment(&self) -> bool {
        self.payment_method.map(|m| m.is_online()).unwrap_or(false)
    }

    /// Distinct listing ids across all items, in a stable order.
    pub fn listing_ids(&self) -> Vec<ListingId> {
        self.items.iter().map(|i| i.listing_id.clone()).collect::<BTreeSet<_>>().into_iter().collect()
    }

    pub fn seller_group(&self, seller_id: &UserId) -> Option<&SellerGroup> {
        self.seller_groups.iter().find(|g| &g.seller_id == seller_id)
    }
}

//--------------------------------------  NewCheckoutSession   ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewCheckoutSession {
    pub id: SessionId,
    pub buyer_id: UserId,
    pub session_type: SessionType,
    pub items: Vec<SessionItem>,
    pub seller_groups: Vec<SellerGroup>,
    pub pricing: SessionPricing,
    /// New sessions are priced for cash on delivery, and start with it selected.
    pub payment_method: PaymentMethod,
    pub reservations: Vec<StockReservation>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
