use std::fmt::Display;

use campus_common::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::{
    checkout_api::errors::ItemError,
    db_types::{
        CartItem,
        DeliveryAddress,
        DeliveryMethod,
        ListingId,
        ListingType,
        PaymentMethod,
        SessionItem,
        UserId,
        VariantId,
        VariantSnapshot,
    },
    traits::{IntentStatus, PaymentIntent},
};

/// A request to buy `quantity` of a listing (or one of its variants).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRequest {
    pub listing_id: ListingId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
}

impl From<&CartItem> for ItemRequest {
    fn from(item: &CartItem) -> Self {
        Self { listing_id: item.listing_id.clone(), variant_id: item.variant_id.clone(), quantity: item.quantity }
    }
}

impl From<&SessionItem> for ItemRequest {
    fn from(item: &SessionItem) -> Self {
        Self { listing_id: item.listing_id.clone(), variant_id: item.variant_id().cloned(), quantity: item.quantity }
    }
}

/// A requested item resolved against the live listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedItem {
    pub listing_id: ListingId,
    pub seller_id: UserId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub item_type: ListingType,
    pub variant: Option<VariantSnapshot>,
    pub image: Option<String>,
    /// Live stock when the item was validated. Services report zero.
    pub available: i64,
}

impl From<ValidatedItem> for SessionItem {
    fn from(item: ValidatedItem) -> Self {
        Self {
            listing_id: item.listing_id,
            seller_id: item.seller_id,
            name: item.name,
            unit_price: item.unit_price,
            quantity: item.quantity,
            item_type: item.item_type,
            variant: item.variant,
            image: item.image,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemValidation {
    pub valid: bool,
    pub items: Vec<ValidatedItem>,
    pub errors: Vec<ItemError>,
}

/// The buyer's changes to an open checkout. Fields that are `None` are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(default)]
    pub delivery_method: Option<DeliveryMethod>,
    #[serde(default)]
    pub delivery_address: Option<DeliveryAddress>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.delivery_method.is_none() && self.delivery_address.is_none() && self.payment_method.is_none()
    }

    pub fn delivery<A: Into<Option<DeliveryAddress>>>(method: DeliveryMethod, address: A) -> Self {
        Self { delivery_method: Some(method), delivery_address: address.into(), payment_method: None }
    }

    pub fn payment(method: PaymentMethod) -> Self {
        Self { payment_method: Some(method), ..Default::default() }
    }

    pub fn with_payment(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectPurchase {
    pub listing_id: ListingId,
    pub quantity: i64,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentResponse {
    pub intent_id: String,
    pub client_secret: Option<String>,
    /// Minor currency units
    pub amount: i64,
    pub currency: String,
    pub status: IntentStatus,
}

impl From<PaymentIntent> for IntentResponse {
    fn from(intent: PaymentIntent) -> Self {
        Self {
            intent_id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
        }
    }
}

/// The payment state of a checkout, as far as the gateway knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatusReport {
    /// No payment intent has been created for the session yet.
    NoIntent,
    /// The gateway is unreachable or not configured.
    GatewayUnavailable,
    Intent(IntentStatus),
}

impl Display for PaymentStatusReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusReport::NoIntent => write!(f, "no_intent"),
            PaymentStatusReport::GatewayUnavailable => write!(f, "gateway_unavailable"),
            PaymentStatusReport::Intent(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for PaymentStatusReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// The outcome of checking an online payment before orders are created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentVerification {
    Paid { transaction_ref: String, paid_at: DateTime<Utc> },
    /// Payment may still complete asynchronously. Orders are created with a pending payment.
    Pending,
    Failed(String),
}
