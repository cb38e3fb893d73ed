use campus_common::Money;
use checkout_engine::{
    db_types::NewUser,
    test_utils::seed::{add_to_cart, seed_buyer, seed_product, seed_seller, seed_service},
    traits::UserManagement,
};
use cucumber::given;

use crate::cucumber::{checkout_world::CheckoutSystem, CheckoutWorld};

fn money(s: &str) -> Money {
    s.parse().expect("Not a valid amount")
}

#[given("a fresh install")]
async fn fresh_database(world: &mut CheckoutWorld) {
    let system = CheckoutSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a seller '{word}' named {string}")]
async fn a_seller(world: &mut CheckoutWorld, id: String, name: String) {
    seed_seller(world.db(), &id, &name).await;
}

#[given(expr = "a seller '{word}' named {string} who delivers to {string}")]
async fn a_seller_on_campus(world: &mut CheckoutWorld, id: String, name: String, campus: String) {
    let user = NewUser::new(id.as_str(), name)
        .with_contact(id.clone(), format!("{id}@campus.edu"), "555-0199".to_string())
        .delivering_to(campus);
    world.db().upsert_user(user).await.expect("Error seeding seller");
}

#[given(expr = "a buyer '{word}'")]
async fn a_buyer(world: &mut CheckoutWorld, id: String) {
    seed_buyer(world.db(), &id).await;
}

#[given(expr = "a buyer '{word}' without a phone number")]
async fn a_buyer_without_phone(world: &mut CheckoutWorld, id: String) {
    let user = NewUser::new(id.as_str(), format!("Buyer {id}"));
    world.db().upsert_user(user).await.expect("Error seeding buyer");
}

#[given(expr = "seller '{word}' lists product {word} at {word} with {int} in stock")]
async fn lists_product(world: &mut CheckoutWorld, seller: String, listing: String, price: String, stock: i64) {
    seed_product(world.db(), &seller, &listing, money(&price), stock).await;
}

#[given(expr = "seller '{word}' lists service {word} at {word}")]
async fn lists_service(world: &mut CheckoutWorld, seller: String, listing: String, price: String) {
    seed_service(world.db(), &seller, &listing, money(&price)).await;
}

#[given(expr = "buyer '{word}' has {int} x {word} in the cart")]
async fn has_in_cart(world: &mut CheckoutWorld, buyer: String, quantity: i64, listing: String) {
    add_to_cart(world.db(), &buyer, &listing, quantity).await;
}
