use crate::{
    db_types::{Listing, ListingId, NewListing, VariantId},
    traits::StoreError,
};

/// Read and stock-mutation access to marketplace listings.
///
/// Stock changes are always atomic increments at the storage level. Callers never read, modify and write stock
/// themselves.
#[allow(async_fn_in_trait)]
pub trait ListingManagement: Clone {
    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, StoreError>;

    async fn fetch_listing(&self, id: &ListingId) -> Result<Option<Listing>, StoreError>;

    /// Fetches all the listings in `ids` in a single query. Unknown ids are silently skipped.
    async fn fetch_listings(&self, ids: &[ListingId]) -> Result<Vec<Listing>, StoreError>;

    /// Atomically adds `delta` (which may be negative) to the listing's stock and returns the new stock level.
    async fn increment_stock(&self, id: &ListingId, delta: i64) -> Result<i64, StoreError>;

    /// Atomically adds `delta` to a variant's stock and returns the new stock level.
    async fn increment_variant_stock(
        &self,
        id: &ListingId,
        variant_id: &VariantId,
        delta: i64,
    ) -> Result<i64, StoreError>;

    async fn set_listing_availability(&self, id: &ListingId, available: bool) -> Result<(), StoreError>;
}
