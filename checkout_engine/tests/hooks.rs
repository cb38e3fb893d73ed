//! Event hooks fire for orders created during checkout and for status changes.
use std::{
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc,
    },
    time::Duration,
};

use campus_common::Money;
use checkout_engine::{
    db_types::{Actor, DeliveryAddress, DeliveryMethod, OrderStatus, PaymentMethod, UserId},
    events::{EventHandlers, EventHooks},
    order_objects::StatusUpdateRequest,
    session_objects::SessionUpdate,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seed::{add_to_cart, seed_buyer, seed_product, seed_seller},
        MockGateway,
    },
    traits::CheckoutDatabase,
    CheckoutConfig,
    CheckoutSessionApi,
    OrderFulfillmentApi,
    OrderStatusApi,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

async fn seeded_db() -> SqliteDatabase {
    let url = random_db_path();
    let db = prepare_test_env(&url).await;
    seed_seller(&db, "sam", "Sam's Books").await;
    seed_seller(&db, "tia", "Tia's Things").await;
    seed_buyer(&db, "alice").await;
    seed_product(&db, "sam", "book", Money::from_major(20), 5).await;
    seed_product(&db, "tia", "lamp", Money::from_major(30), 2).await;
    add_to_cart(&db, "alice", "book", 1).await;
    add_to_cart(&db, "alice", "lamp", 1).await;
    db
}

async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}

#[tokio::test]
async fn hooks_fire_for_checkout_and_status_changes() {
    let created = HookCalled::default();
    let changed = HookCalled::default();
    let completed = HookCalled::default();
    let mut hooks = EventHooks::default();
    let c = created.clone();
    hooks.on_order_created(move |ev| {
        info!("🪝️ Order {} created", ev.order.id);
        let c = c.clone();
        Box::pin(async move { c.called() })
    });
    let c = changed.clone();
    hooks.on_status_changed(move |ev| {
        info!("🪝️ Order {} moved from {} to {}", ev.order.id, ev.old_status, ev.new_status());
        let c = c.clone();
        Box::pin(async move { c.called() })
    });
    let c = completed.clone();
    hooks.on_checkout_completed(move |ev| {
        assert!(ev.failed_sellers.is_empty());
        let c = c.clone();
        Box::pin(async move { c.called() })
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let db = seeded_db().await;
    let config = CheckoutConfig::default();
    let gateway = MockGateway::new();
    let sessions = CheckoutSessionApi::new(db.clone(), gateway.clone(), config.clone());
    let fulfillment = OrderFulfillmentApi::new(db.clone(), gateway, config.clone(), producers.clone());
    let status = OrderStatusApi::new(db.clone(), &config, producers);

    let alice = UserId::from("alice");
    let session = sessions.create_from_cart(&alice).await.expect("Error creating checkout");
    let pickup = DeliveryAddress::Pickup { location: None, note: None };
    let update = SessionUpdate::delivery(DeliveryMethod::SelfPickup, pickup).with_payment(PaymentMethod::Cod);
    sessions.update(&session.id, &alice, update).await.expect("Error updating checkout");
    let result = fulfillment.confirm(&session.id, &alice).await.expect("Error confirming checkout");
    assert_eq!(result.orders.len(), 2);

    let order = result.orders.iter().find(|o| o.seller_id().as_str() == "sam").expect("No order from sam");
    let request = StatusUpdateRequest { status: OrderStatus::Confirmed, note: Some("On it".into()) };
    status.update_status(&order.id, &Actor::user("sam"), request).await.expect("Error confirming order");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(created.count(), 2);
    assert_eq!(changed.count(), 1);
    assert_eq!(completed.count(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn failed_status_changes_do_not_fire_hooks() {
    let changed = HookCalled::default();
    let mut hooks = EventHooks::default();
    let c = changed.clone();
    hooks.on_status_changed(move |_| {
        let c = c.clone();
        Box::pin(async move { c.called() })
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let db = seeded_db().await;
    let config = CheckoutConfig::default();
    let gateway = MockGateway::new();
    let sessions = CheckoutSessionApi::new(db.clone(), gateway.clone(), config.clone());
    let fulfillment = OrderFulfillmentApi::new(db.clone(), gateway, config.clone(), Default::default());
    let status = OrderStatusApi::new(db.clone(), &config, producers);

    let alice = UserId::from("alice");
    let session = sessions.create_from_cart(&alice).await.expect("Error creating checkout");
    let pickup = DeliveryAddress::Pickup { location: None, note: None };
    let update = SessionUpdate::delivery(DeliveryMethod::SelfPickup, pickup).with_payment(PaymentMethod::Cod);
    sessions.update(&session.id, &alice, update).await.expect("Error updating checkout");
    let result = fulfillment.confirm(&session.id, &alice).await.expect("Error confirming checkout");
    let order = result.orders.iter().find(|o| o.seller_id().as_str() == "sam").expect("No order from sam");

    let request = StatusUpdateRequest { status: OrderStatus::Delivered, note: None };
    let err = status.update_status(&order.id, &Actor::user("sam"), request).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_TRANSITION");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(changed.count(), 0);
    tear_down(db).await;
}
