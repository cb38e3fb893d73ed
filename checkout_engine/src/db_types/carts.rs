use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ListingId, UserId, VariantId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub listing_id: ListingId,
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn new(listing_id: ListingId, quantity: i64) -> Self {
        Self { listing_id, variant_id: None, quantity, added_at: Utc::now() }
    }

    pub fn with_variant(mut self, variant_id: VariantId) -> Self {
        self.variant_id = Some(variant_id);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub buyer_id: UserId,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, listing_id: &ListingId) -> bool {
        self.items.iter().any(|i| &i.listing_id == listing_id)
    }
}
