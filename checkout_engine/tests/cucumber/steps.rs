use std::str::FromStr;

use campus_common::Money;
use checkout_engine::{
    db_types::{
        Actor,
        DeliveryAddress,
        DeliveryCategory,
        DeliveryMethod,
        ListingId,
        NotificationKind,
        OrderStatus,
        PaymentMethod,
        PaymentStatus,
        SessionStatus,
        SessionType,
        UserId,
    },
    order_objects::StatusUpdateRequest,
    session_objects::{DirectPurchase, PaymentStatusReport, SessionUpdate},
    traits::{
        CartManagement,
        CheckoutSessionManagement,
        EarningsLedger,
        IntentStatus,
        ListingManagement,
        NotificationDispatch,
    },
};
use cucumber::{then, when};

use crate::cucumber::CheckoutWorld;

fn money(s: &str) -> Money {
    s.parse().expect("Not a valid amount")
}

fn address_for(method: DeliveryMethod) -> DeliveryAddress {
    match method.category() {
        DeliveryCategory::Personal => DeliveryAddress::Personal {
            street: "12 College Ave".into(),
            city: "Springfield".into(),
            state: None,
            landmark: None,
        },
        DeliveryCategory::Campus => {
            DeliveryAddress::Campus { campus: "North".into(), building: "Hall 3".into(), room: Some("101".into()) }
        },
        DeliveryCategory::Pickup => DeliveryAddress::Pickup { location: Some("Library steps".into()), note: None },
    }
}

//--------------------------------------        Sessions        --------------------------------------------------------

#[when(expr = "buyer '{word}' starts a checkout from the cart")]
async fn start_cart_checkout(world: &mut CheckoutWorld, buyer: String) {
    let result = world.system().sessions.create_from_cart(&UserId::from(buyer)).await;
    if let Some(session) = world.record(result) {
        world.sessions.push(session);
    }
}

#[when(expr = "buyer '{word}' buys {int} x {word} directly")]
async fn start_direct_checkout(world: &mut CheckoutWorld, buyer: String, quantity: i64, listing: String) {
    let purchase = DirectPurchase { listing_id: ListingId::from(listing), quantity, variant_id: None };
    let result = world.system().sessions.create_from_direct(&UserId::from(buyer), purchase).await;
    if let Some(session) = world.record(result) {
        world.sessions.push(session);
    }
}

#[when(expr = "buyer '{word}' chooses delivery method '{word}' and payment method '{word}'")]
async fn choose_delivery_and_payment(world: &mut CheckoutWorld, buyer: String, delivery: String, payment: String) {
    let method = DeliveryMethod::from_str(&delivery).expect("Not a delivery method");
    let payment = PaymentMethod::from_str(&payment).expect("Not a payment method");
    let update = SessionUpdate::delivery(method, address_for(method)).with_payment(payment);
    let id = world.session().id.clone();
    let result = world.system().sessions.update(&id, &UserId::from(buyer), update).await;
    if let Some(session) = world.record(result) {
        *world.sessions.last_mut().expect("No session") = session;
    }
}

#[when(expr = "buyer '{word}' chooses payment method '{word}'")]
async fn choose_payment(world: &mut CheckoutWorld, buyer: String, payment: String) {
    let payment = PaymentMethod::from_str(&payment).expect("Not a payment method");
    let id = world.session().id.clone();
    let result = world.system().sessions.update(&id, &UserId::from(buyer), SessionUpdate::payment(payment)).await;
    if let Some(session) = world.record(result) {
        *world.sessions.last_mut().expect("No session") = session;
    }
}

#[when(expr = "buyer '{word}' cancels the checkout")]
async fn cancel_checkout(world: &mut CheckoutWorld, buyer: String) {
    let id = world.session().id.clone();
    let result = world.system().sessions.cancel(&id, &UserId::from(buyer)).await;
    if let Some(session) = world.record(result) {
        *world.sessions.last_mut().expect("No session") = session;
    }
}

#[then(expr = "the checkout is {word}")]
async fn checkout_status(world: &mut CheckoutWorld, status: String) {
    let expected = SessionStatus::from_str(&status).expect("Not a session status");
    let session = world.db().fetch_session(&world.session().id).await.expect("Error fetching session").expect("Gone");
    assert_eq!(session.status, expected);
}

#[then(expr = "the previous checkout is {word}")]
async fn previous_checkout_status(world: &mut CheckoutWorld, status: String) {
    let expected = SessionStatus::from_str(&status).expect("Not a session status");
    let n = world.sessions.len();
    assert!(n >= 2, "Only {n} sessions were started");
    let id = world.sessions[n - 2].id.clone();
    let session = world.db().fetch_session(&id).await.expect("Error fetching session").expect("Gone");
    assert_eq!(session.status, expected);
}

#[then(expr = "buyer '{word}' has no active checkout")]
async fn no_active_checkout(world: &mut CheckoutWorld, buyer: String) {
    let active = world.system().sessions.get_active(&UserId::from(buyer)).await.expect("Error fetching session");
    assert!(active.is_none(), "Unexpected active session {active:?}");
}

#[then(expr = "buyer '{word}' has an active {word} checkout")]
async fn active_checkout_of_type(world: &mut CheckoutWorld, buyer: String, kind: String) {
    let active = world.system().sessions.get_active(&UserId::from(buyer)).await.expect("Error fetching session");
    let session = active.expect("No active session");
    let expected = if kind == "direct" { SessionType::Direct } else { SessionType::Cart };
    assert_eq!(session.session_type, expected);
    assert_eq!(session.id, world.session().id);
}

#[then(expr = "the checkout has {int} reservations")]
async fn reservation_count(world: &mut CheckoutWorld, count: usize) {
    assert_eq!(world.session().reservations.len(), count);
}

#[then(expr = "the checkout has {int} seller groups")]
async fn seller_group_count(world: &mut CheckoutWorld, count: usize) {
    assert_eq!(world.session().seller_groups.len(), count);
}

#[then(expr = "the group for seller '{word}' has subtotal {word}, delivery fee {word} and processor fee {word}")]
async fn group_pricing(world: &mut CheckoutWorld, seller: String, subtotal: String, delivery: String, processor: String) {
    let session = world.session();
    let group = session.seller_group(&UserId::from(seller.as_str())).expect("No group for seller");
    assert_eq!(group.subtotal, money(&subtotal), "subtotal of {seller}");
    assert_eq!(group.delivery_fee, money(&delivery), "delivery fee of {seller}");
    assert_eq!(group.processor_fee, money(&processor), "processor fee of {seller}");
    assert_eq!(group.seller_receives + group.platform_fee + group.processor_fee, group.total_amount);
}

#[then(expr = "the checkout total is {word}")]
async fn checkout_total(world: &mut CheckoutWorld, total: String) {
    assert_eq!(world.session().pricing.total, money(&total));
}

#[then(expr = "the request fails with {word}")]
async fn request_fails(world: &mut CheckoutWorld, code: String) {
    let err = world.last_error.as_ref().expect("The last request succeeded");
    assert_eq!(err.code(), code, "{err}");
}

//--------------------------------------        Payments        --------------------------------------------------------

#[when(expr = "buyer '{word}' requests a payment intent")]
async fn request_intent(world: &mut CheckoutWorld, buyer: String) {
    let id = world.session().id.clone();
    let result = world.system().payments.create_intent(&id, &UserId::from(buyer)).await;
    if let Some(intent) = world.record(result) {
        world.intents.push(intent);
    }
}

#[when(expr = "the gateway reports the payment as {word}")]
async fn gateway_reports(world: &mut CheckoutWorld, status: String) {
    let status: IntentStatus = serde_json::from_value(serde_json::Value::String(status)).expect("Not an intent status");
    let intent = world.intents.last().expect("No payment intent");
    world.system().gateway.set_status(&intent.intent_id, status);
}

#[when("the payment gateway goes offline")]
async fn gateway_offline(world: &mut CheckoutWorld) {
    world.system().gateway.set_unavailable(true);
}

#[then("both payment intents are the same")]
async fn same_intents(world: &mut CheckoutWorld) {
    assert_eq!(world.intents.len(), 2);
    assert_eq!(world.intents[0].intent_id, world.intents[1].intent_id);
}

#[then(expr = "the gateway created {int} intent(s)")]
async fn gateway_created(world: &mut CheckoutWorld, count: usize) {
    assert_eq!(world.system().gateway.create_count(), count);
}

#[then(expr = "the payment intent is for {int} {word}")]
async fn intent_amount(world: &mut CheckoutWorld, amount: i64, currency: String) {
    let intent = world.intents.last().expect("No payment intent");
    assert_eq!(intent.amount, amount);
    assert_eq!(intent.currency, currency);
}

#[then(expr = "buyer '{word}' sees the payment status {word}")]
async fn payment_status(world: &mut CheckoutWorld, buyer: String, status: String) {
    let id = world.session().id.clone();
    let report: PaymentStatusReport =
        world.system().payments.get_status(&id, &UserId::from(buyer)).await.expect("Error fetching payment status");
    assert_eq!(report.to_string(), status);
}

//--------------------------------------      Fulfillment       --------------------------------------------------------

#[when(expr = "buyer '{word}' confirms the checkout")]
async fn confirm_checkout(world: &mut CheckoutWorld, buyer: String) {
    let id = world.session().id.clone();
    let result = world.system().fulfillment.confirm(&id, &UserId::from(buyer)).await;
    if let Some(confirmation) = world.record(result) {
        *world.sessions.last_mut().expect("No session") = confirmation.session.clone();
        world.confirmation = Some(confirmation);
    }
}

#[when(expr = "another buyer leaves only {int} of {word} in stock")]
async fn stock_taken_elsewhere(world: &mut CheckoutWorld, left: i64, listing: String) {
    let id = ListingId::from(listing);
    let listing = world.db().fetch_listing(&id).await.expect("Error fetching listing").expect("No listing");
    world.db().increment_stock(&id, left - listing.stock).await.expect("Error changing stock");
}

#[then(expr = "{int} order(s) were created")]
async fn orders_created(world: &mut CheckoutWorld, count: usize) {
    let confirmation = world.confirmation.as_ref().expect("The checkout was not confirmed");
    assert_eq!(confirmation.orders.len(), count);
}

#[then(expr = "seller '{word}' failed with {word}")]
async fn seller_failed(world: &mut CheckoutWorld, seller: String, code: String) {
    let failures = match (&world.confirmation, &world.last_error) {
        (_, Some(checkout_engine::CheckoutError::OrderCreationFailed(failures))) => failures.clone(),
        (Some(confirmation), _) => confirmation.failures.clone(),
        _ => panic!("There is no confirmation outcome"),
    };
    let failure = failures.iter().find(|f| f.seller_id.as_str() == seller).expect("Seller did not fail");
    assert_eq!(failure.code, code, "{}", failure.reason);
}

#[then(expr = "product {word} has {int} in stock")]
async fn product_stock(world: &mut CheckoutWorld, listing: String, stock: i64) {
    let id = ListingId::from(listing);
    let listing = world.db().fetch_listing(&id).await.expect("Error fetching listing").expect("No listing");
    assert_eq!(listing.stock, stock);
}

#[then(expr = "the cart of '{word}' holds exactly {string}")]
async fn cart_holds(world: &mut CheckoutWorld, buyer: String, listings: String) {
    let cart = world.db().fetch_cart(&UserId::from(buyer)).await.expect("Error fetching cart");
    let mut held = cart.items.iter().map(|i| i.listing_id.to_string()).collect::<Vec<_>>();
    held.sort();
    let mut expected = listings.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect::<Vec<_>>();
    expected.sort();
    assert_eq!(held, expected);
}

#[then(expr = "the order from seller '{word}' has total {word} and payment status {word}")]
async fn order_totals(world: &mut CheckoutWorld, seller: String, total: String, payment: String) {
    let order = world.order_from(&seller);
    assert_eq!(order.total, money(&total));
    let expected = if payment == "paid" { PaymentStatus::Paid } else { PaymentStatus::Pending };
    assert_eq!(order.payment_status, expected);
}

//--------------------------------------     Order status       --------------------------------------------------------

async fn move_order(world: &mut CheckoutWorld, actor: Actor, seller: String, status: OrderStatus) {
    let order = world.order_from(&seller);
    let request = StatusUpdateRequest { status, note: None };
    let result = world.system().status.update_status(&order.id, &actor, request).await;
    world.record(result);
}

#[when(expr = "'{word}' moves the order from seller '{word}' to {word}")]
async fn user_moves_order(world: &mut CheckoutWorld, user: String, seller: String, status: String) {
    let status = OrderStatus::from_str(&status).expect("Not an order status");
    move_order(world, Actor::user(user), seller, status).await;
}

#[when(expr = "admin '{word}' moves the order from seller '{word}' to {word}")]
async fn admin_moves_order(world: &mut CheckoutWorld, user: String, seller: String, status: String) {
    let status = OrderStatus::from_str(&status).expect("Not an order status");
    move_order(world, Actor::admin(user), seller, status).await;
}

#[when(expr = "'{word}' looks up the order from seller '{word}'")]
async fn look_up_order(world: &mut CheckoutWorld, user: String, seller: String) {
    let order = world.order_from(&seller);
    let result = world.system().status.get_order(&order.id, &Actor::user(user)).await;
    world.record(result);
}

#[when("the outbox is dispatched")]
async fn dispatch_outbox(world: &mut CheckoutWorld) {
    let summary = world.system().dispatcher().run_once(100).await.expect("Error dispatching the outbox");
    assert_eq!(summary.failed, 0);
}

#[then(expr = "the order from seller '{word}' is {word}")]
async fn order_status(world: &mut CheckoutWorld, seller: String, status: String) {
    let expected = OrderStatus::from_str(&status).expect("Not an order status");
    let id = world.order_from(&seller).id;
    let order = world.system().status.get_order(&id, &Actor::admin("auditor")).await.expect("Error fetching order");
    assert_eq!(order.status, expected);
    assert_eq!(order.history.last().map(|h| h.status), Some(expected));
}

#[then(expr = "the order from seller '{word}' has {int} stock movements")]
async fn order_movements(world: &mut CheckoutWorld, seller: String, count: usize) {
    let id = world.order_from(&seller).id;
    let movements =
        world.system().status.stock_movements(&id, &Actor::admin("auditor")).await.expect("Error fetching movements");
    assert_eq!(movements.len(), count);
    assert_eq!(movements.iter().map(|m| m.delta).sum::<i64>(), 0, "Stock was not fully restored");
}

#[then(expr = "'{word}' has a {word} notification")]
async fn has_notification(world: &mut CheckoutWorld, user: String, kind: String) {
    let kind: NotificationKind = serde_json::from_value(serde_json::Value::String(kind)).expect("Not a notification kind");
    let notes = world.db().fetch_notifications(&UserId::from(user)).await.expect("Error fetching notifications");
    assert!(notes.iter().any(|n| n.kind == kind), "No {kind} notification in {notes:?}");
}

#[then(expr = "seller '{word}' has earned {word} net of a {word} fee")]
async fn seller_earnings(world: &mut CheckoutWorld, seller: String, net: String, fee: String) {
    let entries = world.db().fetch_earnings(&UserId::from(seller)).await.expect("Error fetching earnings");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].net, money(&net));
    assert_eq!(entries[0].platform_fee, money(&fee));
}
