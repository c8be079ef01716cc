mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::{add_product, bearer, customer, seller, setup};
use serde_json::{Value, json};
use storefront_api::{middleware::auth::AuthUser, routes::create_app};
use tower::ServiceExt;
use uuid::Uuid;

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str, user: Option<&AuthUser>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    builder.body(Body::empty()).expect("request")
}

fn with_json(method: &str, uri: &str, user: &AuthUser, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, bearer(user))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn order_body(product_id: Uuid, quantity: i32) -> Value {
    json!({
        "items": [{ "productId": product_id, "quantity": quantity, "price": 1 }],
        "shippingAddress": common::address(),
        "paymentMethod": "card",
        "notes": "leave at the door"
    })
}

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let (state, _store) = setup();
    let app = create_app(state);

    let (status, body) = send(&app, get("/api/orders/my-orders", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap_or_default().contains("Authorization"));

    let forged = Request::builder()
        .uri("/api/orders/my-orders")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_order_returns_created_with_camel_case_body() {
    let (state, store) = setup();
    let app = create_app(state);
    let buyer = customer();
    let p = add_product(&store, Uuid::new_v4(), "P1", 10_000, 5).await;

    let (status, body) = send(&app, with_json("POST", "/api/orders", &buyer, order_body(p.id, 2))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Order created successfully");
    let order = &body["data"];
    assert_eq!(order["total"], 20_000);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["buyerId"], buyer.user_id.to_string());
    assert_eq!(order["notes"], "leave at the door");
    assert_eq!(order["shippingAddress"]["postalCode"], "80010-000");
    assert!(order["orderNumber"].as_str().unwrap_or_default().starts_with("ORD-"));
    assert_eq!(order["items"][0]["priceAtTime"], 10_000);
    assert_eq!(order["items"][0]["productName"], "P1");
    assert_eq!(store.product(p.id).await.expect("product").stock, 3);
}

#[tokio::test]
async fn insufficient_stock_maps_to_unprocessable_entity() {
    let (state, store) = setup();
    let app = create_app(state);
    let p = add_product(&store, Uuid::new_v4(), "Scarce", 10_000, 1).await;

    let (status, body) = send(&app, with_json("POST", "/api/orders", &customer(), order_body(p.id, 2))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["data"]["error"], "Insufficient stock for: Scarce");
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn empty_cart_is_a_bad_request() {
    let (state, _store) = setup();
    let app = create_app(state);
    let body = json!({
        "items": [],
        "shippingAddress": common::address(),
        "paymentMethod": "card"
    });

    let (status, _) = send(&app, with_json("POST", "/api/orders", &customer(), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_order_bodies_are_bad_requests_in_the_envelope() {
    let (state, store) = setup();
    let app = create_app(state);
    let p = add_product(&store, Uuid::new_v4(), "Mug", 1_500, 5).await;

    let missing_address = json!({
        "items": [{ "productId": p.id, "quantity": 1 }],
        "paymentMethod": "card"
    });
    let (status, body) = send(&app, with_json("POST", "/api/orders", &customer(), missing_address)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().starts_with("Validation error"));
    assert!(body["data"]["error"].as_str().unwrap_or_default().contains("shippingAddress"));
    assert!(body.get("meta").is_some());

    let wordy_quantity = json!({
        "items": [{ "productId": p.id, "quantity": "two" }],
        "shippingAddress": common::address(),
        "paymentMethod": "card"
    });
    let (status, body) = send(&app, with_json("POST", "/api/orders", &customer(), wordy_quantity)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap_or_default().starts_with("Validation error"));

    let not_json = Request::builder()
        .method("POST")
        .uri("/api/orders")
        .header(header::AUTHORIZATION, bearer(&customer()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"items\": ["))
        .expect("request");
    let (status, body) = send(&app, not_json).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["error"].is_string());

    let (status, _) = send(
        &app,
        with_json("PATCH", &format!("/api/orders/{}/status", Uuid::new_v4()), &customer(), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(store.order_count().await, 0);
    assert_eq!(store.product(p.id).await.expect("product").stock, 5);
}

#[tokio::test]
async fn unparseable_pagination_falls_back_to_defaults() {
    let (state, _store) = setup();
    let app = create_app(state);

    let (status, body) = send(&app, get("/api/orders/my-orders?limit=abc&offset=x", Some(&customer()))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"], json!({ "limit": 10, "offset": 0, "total": 0 }));
}

#[tokio::test]
async fn my_orders_carry_pagination_meta() {
    let (state, store) = setup();
    let app = create_app(state);
    let buyer = customer();
    let p = add_product(&store, Uuid::new_v4(), "Tea", 800, 50).await;
    for _ in 0..3 {
        let (status, _) = send(&app, with_json("POST", "/api/orders", &buyer, order_body(p.id, 1))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, get("/api/orders/my-orders?limit=2&offset=1", Some(&buyer))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"], json!({ "limit": 2, "offset": 1, "total": 3 }));
    assert_eq!(body["data"]["orders"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn other_buyers_get_not_found_for_foreign_orders() {
    let (state, store) = setup();
    let app = create_app(state);
    let p = add_product(&store, Uuid::new_v4(), "Tea", 800, 50).await;
    let (_, created) = send(&app, with_json("POST", "/api/orders", &customer(), order_body(p.id, 1))).await;
    let id = created["data"]["id"].as_str().expect("id").to_string();

    let (status, _) = send(&app, get(&format!("/api/orders/{id}"), Some(&customer()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn seller_routes_return_orders_and_analytics() {
    let (state, store) = setup();
    let app = create_app(state);
    let s = seller();
    let p = add_product(&store, s.user_id, "Lamp", 2_500, 10).await;
    send(&app, with_json("POST", "/api/orders", &customer(), order_body(p.id, 2))).await;

    let (status, body) = send(&app, get("/api/seller/orders", Some(&s))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);

    let (status, body) = send(&app, get("/api/seller/analytics", Some(&s))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalOrders"], 1);
    assert_eq!(body["data"]["totalRevenue"], 5_000);
    assert_eq!(body["data"]["averageOrderValue"], 5_000.0);
    assert_eq!(body["data"]["conversionRate"], 0.0);

    let (status, _) = send(&app, get("/api/seller/analytics", Some(&customer()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_status_is_unprocessable() {
    let (state, store) = setup();
    let app = create_app(state);
    let s = seller();
    let p = add_product(&store, s.user_id, "Lamp", 2_500, 10).await;
    let (_, created) = send(&app, with_json("POST", "/api/orders", &customer(), order_body(p.id, 1))).await;
    let id = created["data"]["id"].as_str().expect("id").to_string();
    let uri = format!("/api/orders/{id}/status");

    let (status, _) = send(&app, with_json("PATCH", &uri, &s, json!({ "status": "paid" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(&app, with_json("PATCH", &uri, &s, json!({ "status": "confirmed" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "confirmed");

    let tracking_uri = format!("/api/orders/{id}/tracking");
    let (status, body) = send(
        &app,
        with_json("PATCH", &tracking_uri, &s, json!({ "trackingNumber": "BR123456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["trackingNumber"], "BR123456");
}

#[tokio::test]
async fn unknown_routes_fall_back_to_not_found() {
    let (state, _store) = setup();
    let app = create_app(state);

    let (status, body) = send(&app, get("/api/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/api/nope");
}

#[tokio::test]
async fn health_is_public() {
    let (state, _store) = setup();
    let app = create_app(state);

    let (status, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}
