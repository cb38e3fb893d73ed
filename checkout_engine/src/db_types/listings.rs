use std::fmt::Display;

use campus_common::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use super::{ListingId, UserId, VariantId};

//--------------------------------------     ListingType       ---------------------------------------------------------
/// Products carry stock. Services do not, so no stock checks or stock movements ever apply to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    Product,
    Service,
}

impl ListingType {
    pub fn has_stock(&self) -> bool {
        matches!(self, ListingType::Product)
    }
}

impl Display for ListingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingType::Product => write!(f, "product"),
            ListingType::Service => write!(f, "service"),
        }
    }
}

//--------------------------------------       Listing         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub seller_id: UserId,
    pub name: String,
    pub price: Money,
    pub listing_type: ListingType,
    /// Live stock. Only meaningful for products without variants; variant stock lives on each variant.
    pub stock: i64,
    pub is_available: bool,
    pub images: Vec<String>,
    pub variants: Vec<ListingVariant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn variant(&self, id: &VariantId) -> Option<&ListingVariant> {
        self.variants.iter().find(|v| &v.id == id)
    }

    /// The unit price for the given variant, falling back to the listing price when the variant does not override it.
    pub fn unit_price(&self, variant: Option<&ListingVariant>) -> Money {
        variant.and_then(|v| v.price).unwrap_or(self.price)
    }

    pub fn cover_image(&self) -> Option<String> {
        self.images.first().cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingVariant {
    pub id: VariantId,
    pub name: String,
    pub price: Option<Money>,
    pub stock: i64,
}

/// The frozen view of a variant that travels with session and order items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSnapshot {
    pub id: VariantId,
    pub name: String,
}

impl From<&ListingVariant> for VariantSnapshot {
    fn from(v: &ListingVariant) -> Self {
        Self { id: v.id.clone(), name: v.name.clone() }
    }
}

//--------------------------------------      NewListing       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewListing {
    pub id: ListingId,
    pub seller_id: UserId,
    pub name: String,
    pub price: Money,
    pub listing_type: ListingType,
    pub stock: i64,
    pub is_available: bool,
    pub images: Vec<String>,
    pub variants: Vec<ListingVariant>,
}

impl NewListing {
    pub fn product<S: Into<String>>(seller_id: UserId, name: S, price: Money, stock: i64) -> Self {
        Self {
            id: ListingId::random(),
            seller_id,
            name: name.into(),
            price,
            listing_type: ListingType::Product,
            stock,
            is_available: true,
            images: Vec::new(),
            variants: Vec::new(),
        }
    }

    pub fn service<S: Into<String>>(seller_id: UserId, name: S, price: Money) -> Self {
        Self { listing_type: ListingType::Service, ..Self::product(seller_id, name, price, 0) }
    }

    pub fn with_id<S: Into<ListingId>>(mut self, id: S) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_variant(mut self, variant: ListingVariant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn with_image<S: Into<String>>(mut self, url: S) -> Self {
        self.images.push(url.into());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.is_available = false;
        self
    }
}

//--------------------------------------     StockMovement     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StockMovementReason {
    OrderPlaced,
    OrderCancelled,
    /// The order was cancelled but its listing or variant was gone, so nothing could be put back.
    RestoreSkipped,
}

/// A record of a real change to live stock. Reservations never produce movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StockMovement {
    pub id: i64,
    pub order_id: super::OrderId,
    pub listing_id: ListingId,
    pub variant_id: Option<VariantId>,
    pub delta: i64,
    pub reason: StockMovementReason,
    pub created_at: DateTime<Utc>,
}
