use actix_web::{http::StatusCode, test::TestRequest};
use campus_common::Money;
use checkout_engine::test_utils::seed::{seed_buyer, seed_product, seed_seller};
use serde_json::{json, Value};

use super::helpers::{error_code, TestSystem};

/// Buys two books from sam with cash on pickup and returns the new order.
async fn place_order(sys: &TestSystem) -> Value {
    seed_seller(&sys.db, "sam", "Sam's Books").await;
    seed_buyer(&sys.db, "bea").await;
    seed_buyer(&sys.db, "cal").await;
    seed_product(&sys.db, "sam", "book", Money::from_major(20), 5).await;
    let (_, body) =
        sys.post("bea", "/api/checkout/sessions/direct", json!({ "listing_id": "book", "quantity": 2 })).await;
    let path = format!("/api/checkout/sessions/{}", body["data"]["id"].as_str().unwrap());
    let update = json!({
        "delivery_method": "self_pickup",
        "delivery_address": { "type": "pickup", "location": "Library steps" },
        "payment_method": "cod",
    });
    let (status, _) = sys.patch("bea", &path, update).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = sys.post("bea", &format!("{path}/confirm"), json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["orders"][0].clone()
}

async fn as_admin(sys: &TestSystem, req: TestRequest) -> (StatusCode, Value) {
    sys.send("ada", Some("admin"), req).await
}

#[actix_web::test]
async fn only_parties_see_an_order() {
    let sys = TestSystem::new().await;
    let order = place_order(&sys).await;
    let path = format!("/api/orders/{}", order["id"].as_str().unwrap());

    let (status, body) = sys.get("bea", &path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending");
    let (status, _) = sys.get("sam", &path).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = sys.get("cal", &path).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");
    let (status, _) = as_admin(&sys, TestRequest::get().uri(&path)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = sys.get("sam", "/api/orders/selling").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = sys.get("bea", "/api/orders/buying?status=completed").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn sellers_drive_the_order_forward() {
    let sys = TestSystem::new().await;
    let order = place_order(&sys).await;
    let path = format!("/api/orders/{}/status", order["id"].as_str().unwrap());

    let (status, body) = sys.patch("bea", &path, json!({ "status": "confirmed" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");

    let (status, body) = sys.patch("sam", &path, json!({ "status": "delivered" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_TRANSITION");

    let (status, body) = sys.patch("sam", &path, json!({ "status": "confirmed", "note": "Ready Monday" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "confirmed");
    assert_eq!(body["data"]["history"].as_array().unwrap().len(), 2);

    let (status, body) = sys.patch("sam", &path, json!({ "status": "lost" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
}

#[actix_web::test]
async fn buyers_cancel_pending_orders_once() {
    let sys = TestSystem::new().await;
    let order = place_order(&sys).await;
    let order_id = order["id"].as_str().unwrap();
    let path = format!("/api/orders/{order_id}/cancel");

    let (status, body) = sys.post("bea", &path, json!({ "reason": "Found it cheaper" })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, body) = sys.post("bea", &path, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_TRANSITION");

    let (status, body) = sys.get("bea", &format!("/api/orders/{order_id}/stock_movements")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["data"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn admin_routes_need_the_admin_role() {
    let sys = TestSystem::new().await;
    place_order(&sys).await;

    let (status, body) = sys.get("bea", "/api/admin/orders/buyer/bea").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");
    let (status, _) = sys.send("bea", Some("seller"), TestRequest::get().uri("/api/admin/orders/seller/sam")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = as_admin(&sys, TestRequest::get().uri("/api/admin/orders/buyer/bea")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (status, body) = as_admin(&sys, TestRequest::get().uri("/api/admin/orders/seller/sam")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn sellers_are_notified_once_the_outbox_runs() {
    let sys = TestSystem::new().await;
    place_order(&sys).await;

    let (_, body) = sys.get("sam", "/api/notifications").await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = as_admin(&sys, TestRequest::post().uri("/api/admin/outbox/dispatch")).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = sys.get("sam", "/api/notifications").await;
    assert_eq!(status, StatusCode::OK);
    let kinds = body["data"].as_array().unwrap().iter().map(|n| n["kind"].as_str().unwrap()).collect::<Vec<_>>();
    assert!(kinds.contains(&"new_order"), "{kinds:?}");
}
