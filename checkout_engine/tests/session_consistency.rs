//! Checkout sessions and orders stay consistent across expiry, concurrent writers and vanished listings.
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use campus_common::Money;
use checkout_engine::{
    db_types::{
        Actor,
        Cart,
        CartItem,
        CheckoutSession,
        DeliveryAddress,
        DeliveryMethod,
        Listing,
        ListingId,
        ListingVariant,
        NewCheckoutSession,
        NewListing,
        NewUser,
        OrderStatus,
        PaymentMethod,
        SessionId,
        SessionStatus,
        StockMovementReason,
        UserId,
        UserProfile,
        VariantId,
    },
    session_objects::{DirectPurchase, SessionUpdate},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{add_to_cart, seed_buyer, seed_product, seed_seller},
        MockGateway,
    },
    traits::{CartManagement, CheckoutSessionManagement, ListingManagement, StoreError, UserManagement},
    CheckoutConfig,
    CheckoutError,
    CheckoutSessionApi,
    OrderFulfillmentApi,
    OrderStatusApi,
    SqliteDatabase,
};
use chrono::Duration;

/// Sneaks in a write of the stored session just before the first update lands, as a second tab would.
#[derive(Clone)]
struct RacingDatabase {
    db: SqliteDatabase,
    raced: Arc<AtomicBool>,
}

impl RacingDatabase {
    fn new(db: SqliteDatabase) -> Self {
        Self { db, raced: Arc::new(AtomicBool::new(false)) }
    }
}

impl CheckoutSessionManagement for RacingDatabase {
    async fn insert_session_replacing_active(
        &self,
        session: NewCheckoutSession,
    ) -> Result<(CheckoutSession, Vec<CheckoutSession>), StoreError> {
        self.db.insert_session_replacing_active(session).await
    }

    async fn fetch_session(&self, id: &SessionId) -> Result<Option<CheckoutSession>, StoreError> {
        self.db.fetch_session(id).await
    }

    async fn fetch_active_session(&self, buyer_id: &UserId) -> Result<Option<CheckoutSession>, StoreError> {
        self.db.fetch_active_session(buyer_id).await
    }

    async fn update_session(&self, session: &CheckoutSession) -> Result<CheckoutSession, StoreError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            if let Some(stored) = self.db.fetch_session(&session.id).await? {
                self.db.update_session(&stored).await?;
            }
        }
        self.db.update_session(session).await
    }

    async fn fetch_open_sessions(&self) -> Result<Vec<CheckoutSession>, StoreError> {
        self.db.fetch_open_sessions().await
    }
}

impl ListingManagement for RacingDatabase {
    async fn insert_listing(&self, listing: NewListing) -> Result<Listing, StoreError> {
        self.db.insert_listing(listing).await
    }

    async fn fetch_listing(&self, id: &ListingId) -> Result<Option<Listing>, StoreError> {
        self.db.fetch_listing(id).await
    }

    async fn fetch_listings(&self, ids: &[ListingId]) -> Result<Vec<Listing>, StoreError> {
        self.db.fetch_listings(ids).await
    }

    async fn increment_stock(&self, id: &ListingId, delta: i64) -> Result<i64, StoreError> {
        self.db.increment_stock(id, delta).await
    }

    async fn increment_variant_stock(
        &self,
        id: &ListingId,
        variant_id: &VariantId,
        delta: i64,
    ) -> Result<i64, StoreError> {
        self.db.increment_variant_stock(id, variant_id, delta).await
    }

    async fn set_listing_availability(&self, id: &ListingId, available: bool) -> Result<(), StoreError> {
        self.db.set_listing_availability(id, available).await
    }
}

impl CartManagement for RacingDatabase {
    async fn fetch_cart(&self, buyer_id: &UserId) -> Result<Cart, StoreError> {
        self.db.fetch_cart(buyer_id).await
    }

    async fn add_cart_item(&self, buyer_id: &UserId, item: CartItem) -> Result<Cart, StoreError> {
        self.db.add_cart_item(buyer_id, item).await
    }

    async fn remove_cart_items(&self, buyer_id: &UserId, listing_ids: &[ListingId]) -> Result<u64, StoreError> {
        self.db.remove_cart_items(buyer_id, listing_ids).await
    }
}

impl UserManagement for RacingDatabase {
    async fn fetch_user(&self, id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        self.db.fetch_user(id).await
    }

    async fn upsert_user(&self, user: NewUser) -> Result<UserProfile, StoreError> {
        self.db.upsert_user(user).await
    }
}

async fn marketplace(url: &str) -> SqliteDatabase {
    let db = prepare_test_env(url).await;
    seed_seller(&db, "sam", "Sam's Books").await;
    seed_buyer(&db, "alice").await;
    seed_product(&db, "sam", "book", Money::from_major(20), 5).await;
    db
}

fn sessions(db: &SqliteDatabase, config: CheckoutConfig) -> CheckoutSessionApi<SqliteDatabase, MockGateway> {
    CheckoutSessionApi::new(db.clone(), MockGateway::new(), config)
}

fn book(quantity: i64) -> DirectPurchase {
    DirectPurchase { listing_id: ListingId::from("book"), quantity, variant_id: None }
}

fn pickup() -> SessionUpdate {
    let address = DeliveryAddress::Pickup { location: Some("Library steps".into()), note: None };
    SessionUpdate::delivery(DeliveryMethod::SelfPickup, address).with_payment(PaymentMethod::Cod)
}

#[tokio::test]
async fn session_changes_are_visible_to_other_connections() {
    let url = random_db_path();
    let db = marketplace(&url).await;
    let api = sessions(&db, CheckoutConfig::default());
    let alice = UserId::from("alice");
    let session = api.create_from_direct(&alice, book(1)).await.expect("Error creating checkout");
    let updated = api.update(&session.id, &alice, pickup()).await.expect("Error updating checkout");

    let other = SqliteDatabase::new_with_url(&url, 1).await.expect("Error opening a second connection");
    let seen = other.fetch_session(&session.id).await.expect("Error fetching session").expect("Session is missing");
    assert_eq!(seen.version, updated.version);
    assert_eq!(seen.delivery_method, Some(DeliveryMethod::SelfPickup));
    assert_eq!(seen.payment_method, Some(PaymentMethod::Cod));
}

#[tokio::test]
async fn updates_are_reapplied_after_a_concurrent_write() {
    let db = marketplace(&random_db_path()).await;
    let racing = RacingDatabase::new(db.clone());
    let api = CheckoutSessionApi::new(racing.clone(), MockGateway::new(), CheckoutConfig::default());
    let alice = UserId::from("alice");
    let session = api.create_from_direct(&alice, book(2)).await.expect("Error creating checkout");

    let updated = api.update(&session.id, &alice, pickup()).await.expect("Update should survive one conflict");
    assert!(racing.raced.load(Ordering::SeqCst));
    assert_eq!(updated.version, session.version + 2);
    assert_eq!(updated.delivery_method, Some(DeliveryMethod::SelfPickup));
}

#[tokio::test]
async fn stale_sessions_expire_when_read() {
    let db = marketplace(&random_db_path()).await;
    let api = sessions(&db, CheckoutConfig::default().with_session_ttl(Duration::zero()));
    let alice = UserId::from("alice");
    let session = api.create_from_direct(&alice, book(1)).await.expect("Error creating checkout");

    let fetched = api.get(&session.id, &alice).await.expect("Error fetching checkout");
    assert_eq!(fetched.status, SessionStatus::Expired);
    assert!(api.get_active(&alice).await.expect("Error fetching active checkout").is_none());
    let err = api.update(&session.id, &alice, pickup()).await.expect_err("Expired sessions cannot change");
    assert!(matches!(err, CheckoutError::SessionExpired(_)), "{err}");
}

#[tokio::test]
async fn the_sweep_expires_stale_sessions() {
    let db = marketplace(&random_db_path()).await;
    seed_buyer(&db, "bob").await;
    let api = sessions(&db, CheckoutConfig::default().with_session_ttl(Duration::zero()));
    let alice = api.create_from_direct(&UserId::from("alice"), book(1)).await.expect("Error creating checkout");
    let bob = api.create_from_direct(&UserId::from("bob"), book(1)).await.expect("Error creating checkout");

    assert_eq!(api.expire_stale_sessions().await.expect("Error expiring sessions"), 2);
    for id in [&alice.id, &bob.id] {
        let session = db.fetch_session(id).await.expect("Error fetching session").expect("Session is missing");
        assert_eq!(session.status, SessionStatus::Expired);
    }
    assert_eq!(api.expire_stale_sessions().await.expect("Error expiring sessions"), 0);
}

#[tokio::test]
async fn sessions_being_confirmed_are_left_alone() {
    let db = marketplace(&random_db_path()).await;
    let api = sessions(&db, CheckoutConfig::default());
    let alice = UserId::from("alice");
    let mut session = api.create_from_direct(&alice, book(1)).await.expect("Error creating checkout");
    session.status = SessionStatus::Processing;
    db.update_session(&session).await.expect("Error marking session as processing");

    let err = api.cancel(&session.id, &alice).await.expect_err("Processing sessions cannot be cancelled");
    assert_eq!(err.code(), "INVALID_SESSION_STATE");
    let err = api.create_from_direct(&alice, book(2)).await.expect_err("A processing session blocks a new one");
    assert_eq!(err.code(), "CONCURRENT_CHECKOUT");

    let stored = db.fetch_session(&session.id).await.expect("Error fetching session").expect("Session is missing");
    assert_eq!(stored.status, SessionStatus::Processing);
}

#[tokio::test]
async fn variant_stock_is_taken_and_given_back() {
    let db = marketplace(&random_db_path()).await;
    let medium = ListingVariant { id: VariantId::from("m"), name: "Medium".into(), price: None, stock: 3 };
    let large = ListingVariant { id: VariantId::from("l"), name: "Large".into(), price: Some(Money::from_major(35)), stock: 1 };
    let hoodie = NewListing::product(UserId::from("sam"), "Hoodie", Money::from_major(30), 0)
        .with_id("hoodie")
        .with_variant(medium)
        .with_variant(large);
    db.insert_listing(hoodie).await.expect("Error seeding hoodie");
    let alice = UserId::from("alice");
    db.add_cart_item(&alice, CartItem::new(ListingId::from("hoodie"), 2).with_variant(VariantId::from("m")))
        .await
        .expect("Error adding to cart");

    let config = CheckoutConfig::default();
    let api = sessions(&db, config.clone());
    let fulfillment = OrderFulfillmentApi::new(db.clone(), MockGateway::new(), config.clone(), Default::default());
    let session = api.create_from_cart(&alice).await.expect("Error creating checkout");
    assert_eq!(session.pricing.subtotal, Money::from_major(60));
    api.update(&session.id, &alice, pickup()).await.expect("Error updating checkout");
    let result = fulfillment.confirm(&session.id, &alice).await.expect("Error confirming checkout");
    let order = &result.orders[0];
    assert_eq!(order.items[0].variant_id(), Some(&VariantId::from("m")));

    let variant_stock = |listing: Listing, id: &str| listing.variant(&VariantId::from(id)).map(|v| v.stock);
    let listing = db.fetch_listing(&ListingId::from("hoodie")).await.expect("Error fetching").expect("No hoodie");
    assert_eq!(variant_stock(listing, "m"), Some(1));

    let status = OrderStatusApi::new(db.clone(), &config, Default::default());
    let cancelled = status.cancel(&order.id, &Actor::user("alice"), None).await.expect("Error cancelling order");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    let listing = db.fetch_listing(&ListingId::from("hoodie")).await.expect("Error fetching").expect("No hoodie");
    assert_eq!(variant_stock(listing.clone(), "m"), Some(3));
    assert_eq!(variant_stock(listing, "l"), Some(1));

    let movements = status.stock_movements(&order.id, &Actor::user("alice")).await.expect("Error fetching movements");
    let deltas = movements.iter().map(|m| (m.delta, m.reason)).collect::<Vec<_>>();
    assert_eq!(deltas, vec![(-2, StockMovementReason::OrderPlaced), (2, StockMovementReason::OrderCancelled)]);
}

#[tokio::test]
async fn orders_cancel_even_when_the_listing_is_gone() {
    let db = marketplace(&random_db_path()).await;
    add_to_cart(&db, "alice", "book", 2).await;
    let config = CheckoutConfig::default();
    let api = sessions(&db, config.clone());
    let fulfillment = OrderFulfillmentApi::new(db.clone(), MockGateway::new(), config.clone(), Default::default());
    let alice = UserId::from("alice");
    let session = api.create_from_cart(&alice).await.expect("Error creating checkout");
    api.update(&session.id, &alice, pickup()).await.expect("Error updating checkout");
    let order = fulfillment.confirm(&session.id, &alice).await.expect("Error confirming checkout").orders.remove(0);

    sqlx::query("DELETE FROM listings WHERE id = 'book'").execute(db.pool()).await.expect("Error deleting listing");

    let status = OrderStatusApi::new(db.clone(), &config, Default::default());
    let cancelled = status.cancel(&order.id, &Actor::user("alice"), None).await.expect("Cancel should still succeed");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    let movements = status.stock_movements(&order.id, &Actor::user("alice")).await.expect("Error fetching movements");
    let last = movements.last().expect("No stock movements");
    assert_eq!(last.reason, StockMovementReason::RestoreSkipped);
    assert_eq!(last.delta, 0);
}
