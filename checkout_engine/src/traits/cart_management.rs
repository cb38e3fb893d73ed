use crate::{
    db_types::{Cart, CartItem, ListingId, UserId},
    traits::StoreError,
};

#[allow(async_fn_in_trait)]
pub trait CartManagement: Clone {
    /// Returns the buyer's cart. A buyer without items has an empty cart, not an error.
    async fn fetch_cart(&self, buyer_id: &UserId) -> Result<Cart, StoreError>;

    /// Adds an item to the cart. Adding the same listing and variant again replaces the quantity.
    async fn add_cart_item(&self, buyer_id: &UserId, item: CartItem) -> Result<Cart, StoreError>;

    /// Removes every cart line for the given listings and returns the number of lines removed.
    async fn remove_cart_items(&self, buyer_id: &UserId, listing_ids: &[ListingId]) -> Result<u64, StoreError>;
}
