//! Mock backend HTTP tests

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use pizza_mock_web::MockServer;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn call(method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let router = MockServer::pizza().unwrap().router();

    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "localhost:3000");
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let res = router.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (status, body) = call("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_menu_and_franchises() {
    let (status, menu) = call("GET", "/api/order/menu", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(menu.as_array().unwrap().len(), 2);
    assert_eq!(menu[0]["title"], "Veggie");

    let (status, franchises) = call("GET", "/api/franchise", None).await;
    assert_eq!(status, StatusCode::OK);
    let franchises = franchises.as_array().unwrap();
    assert_eq!(franchises.len(), 3);
    assert_eq!(franchises[2]["name"], "TopSpot");
    assert_eq!(franchises[2]["admins"], json!([]));
    assert_eq!(franchises[2]["stores"], json!([]));
}

#[tokio::test]
async fn test_login_flows() {
    let (status, body) = call(
        "PUT",
        "/api/auth",
        Some(json!({ "email": "d@jwt.com", "password": "a" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token"], "abcdef");

    let (status, body) = call(
        "PUT",
        "/api/auth",
        Some(json!({ "email": "d@jwt.com", "password": "bad" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Unauthorized" }));

    let (status, body) = call("DELETE", "/api/auth", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");
}

#[tokio::test]
async fn test_register_returns_created() {
    let (status, body) = call(
        "POST",
        "/api/auth",
        Some(json!({ "name": "full name", "email": "fullemail@test.com", "password": "b" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["id"], 5);
    assert_eq!(body["user"]["roles"][0]["role"], "diner");
    assert_eq!(body["token"], "newusertoken");
}

#[tokio::test]
async fn test_order_endpoints() {
    let order = json!({
        "items": [
            { "menuId": 1, "description": "Veggie", "price": 0.0038 },
            { "menuId": 2, "description": "Pepperoni", "price": 0.0042 },
        ],
        "storeId": "4",
        "franchiseId": 2,
    });
    let (status, body) = call("POST", "/api/order", Some(order)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["id"], 23);
    assert_eq!(body["jwt"], "eyJpYXQ");

    let (status, history) = call("GET", "/api/order", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history[0]["status"], "Completed");
}

#[tokio::test]
async fn test_mock_failures_surface_as_server_errors() {
    let (status, body) = call("PATCH", "/api/auth", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Missing mock implementation"));

    let (status, _) = call("POST", "/api/order", Some(json!({ "storeId": "9" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_unmocked_paths_are_not_found() {
    let (status, body) = call("GET", "/api/docs", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");

    let (status, _) = call("GET", "/no-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_serves_over_tcp() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(MockServer::pizza().unwrap().serve_listener(listener));

    let menu: Value = reqwest::get(format!("http://{}/api/order/menu", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(menu[1]["price"], 0.0042);

    server.abort();
}
