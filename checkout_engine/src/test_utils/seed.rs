//! Seed data for tests.
use campus_common::Money;

use crate::{
    db_types::{CartItem, Listing, NewListing, NewUser, UserId, UserProfile},
    traits::{CartManagement, ListingManagement, UserManagement},
};

/// A buyer with a complete profile, so that orders can be placed.
pub async fn seed_buyer<B: UserManagement>(db: &B, id: &str) -> UserProfile {
    let user = NewUser::new(id, format!("Buyer {id}")).with_contact(id.to_string(), format!("{id}@campus.edu"), "555-0100".to_string());
    db.upsert_user(user).await.expect("Error seeding buyer")
}

pub async fn seed_seller<B: UserManagement>(db: &B, id: &str, name: &str) -> UserProfile {
    let user = NewUser::new(id, name).with_contact(id.to_string(), format!("{id}@campus.edu"), "555-0199".to_string());
    db.upsert_user(user).await.expect("Error seeding seller")
}

pub async fn seed_product<B: ListingManagement>(db: &B, seller: &str, id: &str, price: Money, stock: i64) -> Listing {
    let listing = NewListing::product(UserId::from(seller), format!("Product {id}"), price, stock).with_id(id);
    db.insert_listing(listing).await.expect("Error seeding product")
}

pub async fn seed_service<B: ListingManagement>(db: &B, seller: &str, id: &str, price: Money) -> Listing {
    let listing = NewListing::service(UserId::from(seller), format!("Service {id}"), price).with_id(id);
    db.insert_listing(listing).await.expect("Error seeding service")
}

pub async fn add_to_cart<B: CartManagement>(db: &B, buyer: &str, listing: &str, quantity: i64) {
    db.add_cart_item(&UserId::from(buyer), CartItem::new(listing.into(), quantity)).await.expect("Error adding to cart");
}
