use actix_web::http::StatusCode;
use campus_common::Money;
use checkout_engine::test_utils::seed::{add_to_cart, seed_buyer, seed_product, seed_seller, seed_service};
use serde_json::json;

use super::helpers::{error_code, TestSystem};

async fn marketplace() -> TestSystem {
    let sys = TestSystem::new().await;
    seed_seller(&sys.db, "sam", "Sam's Books").await;
    seed_seller(&sys.db, "tia", "Tia Tutoring").await;
    seed_buyer(&sys.db, "bea").await;
    seed_buyer(&sys.db, "cal").await;
    seed_product(&sys.db, "sam", "book", Money::from_major(20), 5).await;
    seed_service(&sys.db, "tia", "tutoring", Money::from_major(15)).await;
    sys
}

fn pickup(payment: &str) -> serde_json::Value {
    json!({
        "delivery_method": "pickup",
        "delivery_address": { "type": "pickup", "location": "Library steps" },
        "payment_method": payment,
    })
}

#[actix_web::test]
async fn requests_without_a_caller_are_rejected() {
    let sys = marketplace().await;
    let (status, body) = sys.post("", "/api/checkout/sessions/cart", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHENTICATED");
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn empty_cart() {
    let sys = marketplace().await;
    let (status, body) = sys.post("bea", "/api/checkout/sessions/cart", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "EMPTY_CART");
}

#[actix_web::test]
async fn cart_checkout_from_start_to_finish() {
    let sys = marketplace().await;
    add_to_cart(&sys.db, "bea", "book", 2).await;
    add_to_cart(&sys.db, "bea", "tutoring", 1).await;

    let (status, body) = sys.post("bea", "/api/checkout/sessions/cart", json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["seller_groups"].as_array().unwrap().len(), 2);
    let session_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = sys.get("bea", "/api/checkout/sessions/active").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], session_id.as_str());

    let path = format!("/api/checkout/sessions/{session_id}");
    let (status, body) = sys.patch("bea", &path, pickup("cod")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["payment_method"], "cod");
    assert_eq!(body["data"]["delivery_method"], "self_pickup");

    let (status, body) = sys.post("bea", &format!("{path}/confirm"), json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["orders"].as_array().unwrap().len(), 2);
    assert!(body["data"]["failures"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["session"]["status"], "completed");

    let (status, body) = sys.get("bea", "/api/orders/buying").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = sys.get("bea", "/api/checkout/sessions/active").await;
    assert!(body["data"].is_null());
}

#[actix_web::test]
async fn sessions_belong_to_their_buyer() {
    let sys = marketplace().await;
    let (status, body) =
        sys.post("bea", "/api/checkout/sessions/direct", json!({ "listing_id": "book", "quantity": 1 })).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let session_id = body["data"]["id"].as_str().unwrap().to_string();
    let path = format!("/api/checkout/sessions/{session_id}");

    let (status, body) = sys.get("cal", &path).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "FORBIDDEN");

    let (status, _) = sys.get("bea", "/api/checkout/sessions/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn bad_input_is_a_validation_error() {
    let sys = marketplace().await;
    let (status, body) =
        sys.post("bea", "/api/checkout/sessions/direct", json!({ "listing_id": "book", "quantity": 9 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_ITEMS");
    assert!(!body["data"]["items"].as_array().unwrap().is_empty());

    let (status, body) =
        sys.post("bea", "/api/checkout/sessions/direct", json!({ "listing_id": "book", "quantity": 1 })).await;
    assert_eq!(status, StatusCode::CREATED);
    let path = format!("/api/checkout/sessions/{}", body["data"]["id"].as_str().unwrap());
    let (status, body) = sys.patch("bea", &path, json!({ "delivery_method": "teleport" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
}

#[actix_web::test]
async fn absurd_quantities_are_rejected() {
    let sys = marketplace().await;
    seed_service(&sys.db, "tia", "thesis_coaching", Money::from_major(5_000_000)).await;

    let huge = json!({ "listing_id": "tutoring", "quantity": 100_000_000_000_000_000i64 });
    let (status, body) = sys.post("bea", "/api/checkout/sessions/direct", huge).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(error_code(&body), "INVALID_ITEMS");
    assert_eq!(body["data"]["items"][0]["code"], "INVALID_QUANTITY");

    let pricey = json!({ "listing_id": "thesis_coaching", "quantity": 3 });
    let (status, body) = sys.post("bea", "/api/checkout/sessions/direct", pricey).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["data"]["items"][0]["code"], "AMOUNT_TOO_LARGE");

    let (status, body) =
        sys.post("bea", "/api/checkout/sessions/direct", json!({ "listing_id": "tutoring", "quantity": 10_000 })).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["pricing"]["subtotal"], 15_000_000);
}

#[actix_web::test]
async fn cancelling_a_checkout() {
    let sys = marketplace().await;
    let (_, body) =
        sys.post("bea", "/api/checkout/sessions/direct", json!({ "listing_id": "book", "quantity": 2 })).await;
    let path = format!("/api/checkout/sessions/{}", body["data"]["id"].as_str().unwrap());
    let (status, body) = sys.post("bea", &format!("{path}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");
    let (status, body) = sys.patch("bea", &path, pickup("cod")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "INVALID_SESSION_STATE");
}

#[actix_web::test]
async fn payment_intents() {
    let sys = marketplace().await;
    let (_, body) =
        sys.post("bea", "/api/checkout/sessions/direct", json!({ "listing_id": "book", "quantity": 2 })).await;
    assert_eq!(body["data"]["payment_method"], "cod");
    let path = format!("/api/checkout/sessions/{}", body["data"]["id"].as_str().unwrap());

    let (status, body) = sys.post("bea", &format!("{path}/payment_intent"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "PAYMENT_METHOD_NOT_ONLINE");
    let (_, body) = sys.get("bea", &format!("{path}/payment_status")).await;
    assert_eq!(body["data"]["status"], "no_intent");

    let (status, _) = sys.patch("bea", &path, pickup("card")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, first) = sys.post("bea", &format!("{path}/payment_intent"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert!(first["data"]["amount"].as_i64().unwrap() >= 4000);
    let (_, second) = sys.post("bea", &format!("{path}/payment_intent"), json!({})).await;
    assert_eq!(first["data"]["intent_id"], second["data"]["intent_id"]);
    assert_eq!(sys.gateway.create_count(), 1);

    let (_, body) = sys.get("bea", &format!("{path}/payment_status")).await;
    assert_eq!(body["data"]["status"], "requires_payment_method");

    let (status, body) = sys.post("bea", &format!("{path}/payment_intent/confirm"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "succeeded");

    let (status, body) = sys.post("bea", &format!("{path}/confirm"), json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["orders"][0]["payment_status"], "paid");
}

#[actix_web::test]
async fn an_offline_gateway_is_a_bad_gateway() {
    let sys = marketplace().await;
    let (_, body) =
        sys.post("bea", "/api/checkout/sessions/direct", json!({ "listing_id": "book", "quantity": 2 })).await;
    let path = format!("/api/checkout/sessions/{}", body["data"]["id"].as_str().unwrap());
    sys.patch("bea", &path, pickup("card")).await;
    sys.gateway.set_unavailable(true);
    let (status, body) = sys.post("bea", &format!("{path}/payment_intent"), json!({})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_code(&body), "GATEWAY_ERROR");
}
