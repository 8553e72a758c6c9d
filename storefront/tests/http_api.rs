//! `HttpOrderApi` against a mock HTTP server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use std::time::Duration;
use storefront::config::ApiConfig;
use storefront::{
    ApiError, HttpOrderApi, LineItem, Order, OrderApi, OrderId, OrderStatus, Product, ProductId,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> HttpOrderApi {
    HttpOrderApi::new(format!("{}/api/", server.uri())).unwrap()
}

#[tokio::test]
async fn test_upload_order_posts_lines() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(body_json(json!([
            {"id": "1", "price": 10.0, "count": 2},
            {"id": "2", "price": 5.5, "count": 1}
        ])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut mug = LineItem::from_product(Product::new(1_u64, "Mug", Decimal::new(1000, 2)));
    mug.quantity = 2;
    let tea = LineItem::from_product(Product::new(2_u64, "Tea", Decimal::new(550, 2)));
    let order = Order::new(OrderId::new("1735689600000"), vec![mug, tea], Utc::now());

    client(&server).upload_order(&order).await.unwrap();
}

fn empty_order() -> Order {
    Order::new(OrderId::new("1"), Vec::new(), Utc::now())
}

#[tokio::test]
async fn test_fetch_orders_decodes_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "1735689600000",
                "items": [{"id": 7, "title": "Mug", "price": 9.5, "image": "", "quantity": 2}],
                "total": 19.0,
                "status": "paid",
                "placed_at": "2025-01-01T00:00:00Z"
            },
            {"id": "2", "items": [], "total": 0, "status": "new"}
        ])))
        .mount(&server)
        .await;

    let orders = client(&server).fetch_orders().await.unwrap();

    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id, OrderId::new("1735689600000"));
    assert_eq!(orders[0].status, OrderStatus::Paid);
    assert_eq!(orders[0].items[0].id, ProductId::from(7_u64));
    assert_eq!(orders[0].total, Decimal::new(1900, 2));
    assert_eq!(orders[1].status, OrderStatus::New);
}

#[tokio::test]
async fn test_update_status_puts_camel_case_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/orders/42/status"))
        .and(body_json(json!({"orderId": "42", "status": "delivered"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .update_status(&OrderId::new("42"), OrderStatus::Delivered)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_status_encodes_order_id_as_one_segment() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/orders/a%2Fb%3Fx=1/status"))
        .and(body_json(json!({"orderId": "a/b?x=1", "status": "paid"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .update_status(&OrderId::new("a/b?x=1"), OrderStatus::Paid)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(422).set_body_string("price mismatch"))
        .mount(&server)
        .await;

    let error = client(&server)
        .upload_order(&empty_order())
        .await
        .unwrap_err();

    assert_eq!(
        error,
        ApiError::Status {
            status: 422,
            message: "price mismatch".to_string(),
        }
    );
}

#[tokio::test]
async fn test_bad_json_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let error = client(&server).fetch_orders().await.unwrap_err();
    assert!(matches!(error, ApiError::Decode(_)));
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpOrderApi::from_config(&ApiConfig {
        base_url: format!("{}/api", server.uri()),
        token: Some("s3cret".to_string()),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    assert!(api.fetch_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let api = HttpOrderApi::from_config(&ApiConfig {
        base_url: format!("{}/api", server.uri()),
        token: None,
        timeout: Duration::from_millis(50),
    })
    .unwrap();

    assert!(matches!(
        api.fetch_orders().await.unwrap_err(),
        ApiError::Transport(_)
    ));
}

#[test]
fn test_trailing_slash_is_trimmed() {
    let api = HttpOrderApi::new("http://localhost:3000/api/").unwrap();
    assert_eq!(api.base_url(), "http://localhost:3000/api");
}

#[test]
fn test_invalid_base_url_is_rejected() {
    assert!(matches!(
        HttpOrderApi::new("not a url"),
        Err(ApiError::Transport(_))
    ));
}
