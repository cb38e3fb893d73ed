//! Item validation and advisory stock reservations.
//!
//! Reservations are bookkeeping only. They do not take stock and do not stop other buyers from checking out the
//! same items. The only authoritative stock check is the guarded decrement made when an order is created, so
//! "insufficient stock" at confirmation is an expected outcome.
use std::collections::HashMap;

use campus_common::Money;
use chrono::Utc;
use log::*;

use crate::{
    checkout_api::{
        errors::{CheckoutError, ItemError},
        session_objects::{ItemRequest, ItemValidation, ValidatedItem},
    },
    db_types::{SessionId, SessionItem, StockReservation, VariantSnapshot},
    traits::ListingManagement,
};

/// The most units of one listing a single checkout may ask for.
pub const MAX_ITEM_QUANTITY: i64 = 10_000;
/// The largest item total a single checkout may carry, before delivery and fees.
pub const MAX_CHECKOUT_SUBTOTAL: Money = Money::from_major(10_000_000);

#[derive(Clone)]
pub struct StockReservationApi<B> {
    db: B,
}

impl<B> StockReservationApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B: ListingManagement> StockReservationApi<B> {
    /// Resolves each request against the live listing, in one batch fetch.
    ///
    /// An item is valid if its listing exists and is available, the quantity is positive, any requested variant
    /// exists and, for products, the quantity does not exceed live stock (variant stock if a variant was given).
    /// Quantities above [`MAX_ITEM_QUANTITY`] and items that would push the checkout past [`MAX_CHECKOUT_SUBTOTAL`]
    /// are rejected, so totals computed from a validated set cannot overflow.
    pub async fn validate_items(&self, requests: &[ItemRequest]) -> Result<ItemValidation, CheckoutError> {
        let ids = requests.iter().map(|r| r.listing_id.clone()).collect::<Vec<_>>();
        let listings = self.db.fetch_listings(&ids).await?;
        let listings = listings.into_iter().map(|l| (l.id.clone(), l)).collect::<HashMap<_, _>>();
        let mut result = ItemValidation::default();
        let mut running_total = Money::default();
        for request in requests {
            let fail = |code: &str, reason: String| ItemError {
                listing_id: request.listing_id.clone(),
                code: code.to_string(),
                reason,
            };
            let Some(listing) = listings.get(&request.listing_id) else {
                result.errors.push(fail("LISTING_NOT_FOUND", "This listing no longer exists".into()));
                continue;
            };
            if !listing.is_available {
                result.errors.push(fail("LISTING_UNAVAILABLE", format!("{} is not available", listing.name)));
                continue;
            }
            if request.quantity <= 0 {
                result.errors.push(fail("INVALID_QUANTITY", format!("Quantity must be positive, not {}", request.quantity)));
                continue;
            }
            if request.quantity > MAX_ITEM_QUANTITY {
                result.errors.push(fail(
                    "INVALID_QUANTITY",
                    format!("At most {MAX_ITEM_QUANTITY} units can be bought at once, not {}", request.quantity),
                ));
                continue;
            }
            let variant = match &request.variant_id {
                Some(vid) => match listing.variant(vid) {
                    Some(v) => Some(v),
                    None => {
                        result.errors.push(fail("VARIANT_NOT_FOUND", format!("{} has no option {vid}", listing.name)));
                        continue;
                    },
                },
                None => None,
            };
            let available = match (listing.listing_type.has_stock(), variant) {
                (false, _) => 0,
                (true, Some(v)) => v.stock,
                (true, None) => listing.stock,
            };
            if listing.listing_type.has_stock() && request.quantity > available {
                result.errors.push(fail(
                    "INSUFFICIENT_STOCK",
                    format!("Only {available} of {} left, but {} requested", listing.name, request.quantity),
                ));
                continue;
            }
            let unit_price = listing.unit_price(variant);
            let within_limit = unit_price
                .checked_mul(request.quantity)
                .and_then(|line| running_total.checked_add(line))
                .filter(|total| *total <= MAX_CHECKOUT_SUBTOTAL);
            let Some(total) = within_limit else {
                result.errors.push(fail(
                    "AMOUNT_TOO_LARGE",
                    format!("{} x {} would take this checkout over {MAX_CHECKOUT_SUBTOTAL}", request.quantity, listing.name),
                ));
                continue;
            };
            running_total = total;
            result.items.push(ValidatedItem {
                listing_id: listing.id.clone(),
                seller_id: listing.seller_id.clone(),
                name: listing.name.clone(),
                unit_price,
                quantity: request.quantity,
                item_type: listing.listing_type,
                variant: variant.map(VariantSnapshot::from),
                image: listing.cover_image(),
                available,
            });
        }
        result.valid = result.errors.is_empty();
        trace!("🛒 Validated {} items with {} problems", requests.len(), result.errors.len());
        Ok(result)
    }

    /// Records a reservation for every product item. Services have no stock and get no reservation.
    pub fn reserve(&self, items: &[SessionItem]) -> Vec<StockReservation> {
        let now = Utc::now();
        let reservations = items
            .iter()
            .filter(|i| i.item_type.has_stock())
            .map(|i| StockReservation {
                listing_id: i.listing_id.clone(),
                variant_id: i.variant_id().cloned(),
                quantity: i.quantity,
                reserved_at: now,
            })
            .collect::<Vec<_>>();
        debug!("🛒 Recorded {} advisory stock reservations", reservations.len());
        reservations
    }

    /// Releases a session's reservations. Live stock is untouched, since reserving never took any.
    pub fn release(&self, session_id: &SessionId, reservations: &[StockReservation]) {
        if reservations.is_empty() {
            return;
        }
        for r in reservations {
            trace!("🛒 Released {} x {} for session {session_id}", r.quantity, r.listing_id);
        }
        debug!("🛒 Released {} stock reservations for session {session_id}", reservations.len());
    }
}
