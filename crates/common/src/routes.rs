//! Mock route handlers and dispatch
//!
//! A [`MockRouter`] is an ordered list of URL globs, each bound to a
//! [`RouteHandler`]. The browser interceptor and the standalone mock
//! server both dispatch through the same router, so the fixtures behave
//! identically whichever way the frontend reaches them.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{MockError, MockResult};
use crate::fixtures;
use crate::matcher::{match_object, require_properties};
use crate::pattern::RoutePattern;
use crate::types::LoginRequest;

pub const JSON_CONTENT_TYPE: &str = "application/json";

pub const MENU_ROUTE: &str = "*/**/api/order/menu";
pub const FRANCHISE_ROUTE: &str = "*/**/api/franchise";
pub const AUTH_ROUTE: &str = "*/**/api/auth";
pub const ORDER_ROUTE: &str = "*/**/api/order";

/// An intercepted request
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub url: String,
    pub body: Option<String>,
}

impl MockRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            url: url.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_json<T: Serialize>(self, body: &T) -> MockResult<Self> {
        Ok(self.with_body(serde_json::to_string(body)?))
    }

    /// Parse the body as JSON; a missing body is an error.
    pub fn json_body(&self, route: &str) -> MockResult<Value> {
        let body = self.body.as_deref().ok_or_else(|| MockError::InvalidBody {
            route: route.to_string(),
            reason: "request has no body".to_string(),
        })?;
        serde_json::from_str(body).map_err(|e| MockError::InvalidBody {
            route: route.to_string(),
            reason: e.to_string(),
        })
    }
}

/// A canned response
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn json<T: Serialize>(status: u16, body: &T) -> MockResult<Self> {
        Ok(Self {
            status,
            content_type: JSON_CONTENT_TYPE.to_string(),
            body: serde_json::to_vec(body)?,
        })
    }

    pub fn ok<T: Serialize>(body: &T) -> MockResult<Self> {
        Self::json(200, body)
    }

    pub fn body_json(&self) -> MockResult<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Handler bound to one route glob
pub trait RouteHandler: Send + Sync {
    /// Path used in failure messages
    fn route(&self) -> &str;

    fn handle(&self, req: &MockRequest) -> MockResult<MockResponse>;
}

fn require_method(route: &str, req: &MockRequest, expected: &str) -> MockResult<()> {
    if req.method == expected {
        Ok(())
    } else {
        Err(MockError::UnexpectedMethod {
            route: route.to_string(),
            method: req.method.clone(),
            expected: expected.to_string(),
        })
    }
}

fn require_body_properties(route: &str, body: &Value, properties: &[&str]) -> MockResult<()> {
    require_properties(body, properties).map_err(|property| MockError::MissingProperty {
        route: route.to_string(),
        property: property.to_string(),
    })
}

/// GET /api/order/menu
pub struct MenuRoute;

impl RouteHandler for MenuRoute {
    fn route(&self) -> &str {
        "/api/order/menu"
    }

    fn handle(&self, req: &MockRequest) -> MockResult<MockResponse> {
        require_method(self.route(), req, "GET")?;
        MockResponse::ok(&fixtures::menu())
    }
}

/// GET /api/franchise
pub struct FranchiseRoute;

impl RouteHandler for FranchiseRoute {
    fn route(&self) -> &str {
        "/api/franchise"
    }

    fn handle(&self, req: &MockRequest) -> MockResult<MockResponse> {
        require_method(self.route(), req, "GET")?;
        MockResponse::ok(&fixtures::franchises())
    }
}

/// PUT login, DELETE logout, POST register
pub struct AuthRoute;

impl AuthRoute {
    fn login(&self, req: &MockRequest) -> MockResult<MockResponse> {
        let body = req.json_body(self.route())?;
        require_body_properties(self.route(), &body, &["email", "password"])?;

        let login: LoginRequest = match serde_json::from_value(body) {
            Ok(login) => login,
            Err(_) => return MockResponse::json(401, &fixtures::unauthorized()),
        };

        match fixtures::login_for(&login.email, &login.password) {
            Some(res) => MockResponse::ok(&res),
            None => {
                debug!("Rejecting login for {}", login.email);
                MockResponse::json(401, &fixtures::unauthorized())
            }
        }
    }

    fn register(&self, req: &MockRequest) -> MockResult<MockResponse> {
        let body = req.json_body(self.route())?;
        require_body_properties(self.route(), &body, &["name", "email", "password"])?;

        // name and email are echoed back verbatim, whatever their JSON type
        let mut created = serde_json::to_value(fixtures::registered_user("", ""))?;
        created["user"]["name"] = body["name"].clone();
        created["user"]["email"] = body["email"].clone();
        MockResponse::json(201, &created)
    }
}

impl RouteHandler for AuthRoute {
    fn route(&self) -> &str {
        "/api/auth"
    }

    fn handle(&self, req: &MockRequest) -> MockResult<MockResponse> {
        match req.method.as_str() {
            "PUT" => self.login(req),
            "DELETE" => MockResponse::ok(&fixtures::logged_out()),
            "POST" => self.register(req),
            _ => Err(MockError::Unhandled {
                route: self.route().to_string(),
                method: req.method.clone(),
            }),
        }
    }
}

/// POST places an order, GET lists history
pub struct OrderRoute;

impl RouteHandler for OrderRoute {
    fn route(&self) -> &str {
        "/api/order"
    }

    fn handle(&self, req: &MockRequest) -> MockResult<MockResponse> {
        match req.method.as_str() {
            "POST" => {
                let body = req.json_body(self.route())?;
                let expected = serde_json::to_value(fixtures::expected_order_request())?;
                match_object(&body, &expected).map_err(|m| MockError::BodyMismatch {
                    route: self.route().to_string(),
                    path: m.path,
                    reason: m.reason,
                })?;
                MockResponse::ok(&fixtures::order_placed())
            }
            "GET" => MockResponse::ok(&fixtures::order_history()),
            _ => Err(MockError::Unhandled {
                route: self.route().to_string(),
                method: req.method.clone(),
            }),
        }
    }
}

#[derive(Clone)]
struct MockRoute {
    pattern: RoutePattern,
    handler: Arc<dyn RouteHandler>,
}

/// Ordered set of mock routes
///
/// When several patterns match, the most recently added wins.
#[derive(Clone, Default)]
pub struct MockRouter {
    routes: Vec<MockRoute>,
}

impl MockRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with the menu, franchise, auth and order fixtures installed.
    pub fn pizza() -> MockResult<Self> {
        let mut router = Self::new();
        router.route(MENU_ROUTE, MenuRoute)?;
        router.route(FRANCHISE_ROUTE, FranchiseRoute)?;
        router.route(AUTH_ROUTE, AuthRoute)?;
        router.route(ORDER_ROUTE, OrderRoute)?;
        Ok(router)
    }

    pub fn route<H: RouteHandler + 'static>(&mut self, glob: &str, handler: H) -> MockResult<&mut Self> {
        let pattern = RoutePattern::new(glob)?;
        self.routes.push(MockRoute {
            pattern,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    pub fn patterns(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.pattern.glob()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Whether any route pattern matches `url`
    pub fn claims(&self, url: &str) -> bool {
        self.routes.iter().any(|r| r.pattern.matches(url))
    }

    /// `Ok(None)` means no route matched and the request should pass
    /// through untouched.
    pub fn dispatch(&self, req: &MockRequest) -> MockResult<Option<MockResponse>> {
        let Some(route) = self.routes.iter().rev().find(|r| r.pattern.matches(&req.url)) else {
            return Ok(None);
        };

        debug!("{} {} -> {}", req.method, req.url, route.pattern);
        match route.handler.handle(req) {
            Ok(res) => Ok(Some(res)),
            Err(e) => {
                warn!("Mock route {} failed: {}", route.pattern, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthResponse, ErrorBody, Franchise, MenuItem, OrderPlaced, Role};
    use serde_json::json;

    const BASE: &str = "http://localhost:5173";

    fn router() -> MockRouter {
        MockRouter::pizza().unwrap()
    }

    fn send(req: MockRequest) -> MockResult<Option<MockResponse>> {
        router().dispatch(&req)
    }

    fn url(path: &str) -> String {
        format!("{}{}", BASE, path)
    }

    #[test]
    fn test_menu_get() {
        let res = send(MockRequest::new("GET", url("/api/order/menu"))).unwrap().unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.content_type, JSON_CONTENT_TYPE);
        let menu: Vec<MenuItem> = serde_json::from_slice(&res.body).unwrap();
        assert_eq!(menu.len(), 2);
        assert_eq!(menu[1].title, "Pepperoni");
    }

    #[test]
    fn test_menu_rejects_other_methods() {
        let err = send(MockRequest::new("POST", url("/api/order/menu"))).unwrap_err();
        assert!(matches!(err, MockError::UnexpectedMethod { .. }));
    }

    #[test]
    fn test_franchise_list_includes_empty_franchise() {
        let res = send(MockRequest::new("get", url("/api/franchise"))).unwrap().unwrap();
        let franchises: Vec<Franchise> = serde_json::from_slice(&res.body).unwrap();
        let names: Vec<&str> = franchises.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["LotaPizza", "PizzaCorp", "TopSpot"]);
        assert!(franchises[2].admins.is_empty() && franchises[2].stores.is_empty());
    }

    #[test]
    fn test_franchise_create_is_hard_failure() {
        let req = MockRequest::new("POST", url("/api/franchise"))
            .with_body(r#"{"name":"franchise name test","admins":[{"email":"franchse admin"}]}"#);
        let err = send(req).unwrap_err();
        assert!(matches!(err, MockError::UnexpectedMethod { ref expected, .. } if expected == "GET"));
    }

    #[test]
    fn test_diner_login() {
        let req = MockRequest::new("PUT", url("/api/auth"))
            .with_body(r#"{"email":"d@jwt.com","password":"a"}"#);
        let res = send(req).unwrap().unwrap();
        assert_eq!(res.status, 200);
        let auth: AuthResponse = serde_json::from_slice(&res.body).unwrap();
        assert_eq!(auth.user.name, "Kai Chen");
        assert_eq!(auth.token, "abcdef");
    }

    #[test]
    fn test_admin_login() {
        let req = MockRequest::new("PUT", url("/api/auth"))
            .with_body(r#"{"email":"a@jwt.com","password":"admin"}"#);
        let auth: AuthResponse = serde_json::from_slice(&send(req).unwrap().unwrap().body).unwrap();
        assert!(auth.user.has_role(Role::Admin));
        assert_eq!(auth.token, "ghijkl");
    }

    #[test]
    fn test_invalid_login_is_unauthorized() {
        let req = MockRequest::new("PUT", url("/api/auth"))
            .with_body(r#"{"email":"d@jwt.com","password":"nope"}"#);
        let res = send(req).unwrap().unwrap();
        assert_eq!(res.status, 401);
        assert_eq!(res.content_type, JSON_CONTENT_TYPE);
        let body: ErrorBody = serde_json::from_slice(&res.body).unwrap();
        assert_eq!(body.error, "Unauthorized");
    }

    #[test]
    fn test_login_requires_password_property() {
        let req = MockRequest::new("PUT", url("/api/auth")).with_body(r#"{"email":"d@jwt.com"}"#);
        let err = send(req).unwrap_err();
        assert!(matches!(err, MockError::MissingProperty { ref property, .. } if property == "password"));
    }

    #[test]
    fn test_login_with_garbage_body() {
        let req = MockRequest::new("PUT", url("/api/auth")).with_body("not json");
        assert!(matches!(send(req).unwrap_err(), MockError::InvalidBody { .. }));

        let req = MockRequest::new("PUT", url("/api/auth"));
        assert!(matches!(send(req).unwrap_err(), MockError::InvalidBody { .. }));
    }

    #[test]
    fn test_logout() {
        let res = send(MockRequest::new("DELETE", url("/api/auth"))).unwrap().unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.body_json().unwrap(), json!({ "message": "Logged out successfully" }));
    }

    #[test]
    fn test_register_echoes_and_returns_created() {
        let req = MockRequest::new("POST", url("/api/auth"))
            .with_json(&json!({ "name": "full name", "email": "fullemail@test.com", "password": "b" }))
            .unwrap();
        let res = send(req).unwrap().unwrap();
        assert_eq!(res.status, 201);
        assert_eq!(
            res.body_json().unwrap(),
            json!({
                "user": {
                    "id": 5,
                    "name": "full name",
                    "email": "fullemail@test.com",
                    "roles": [{ "role": "diner" }],
                },
                "token": "newusertoken",
            })
        );
    }

    #[test]
    fn test_register_echoes_non_string_identity() {
        let req = MockRequest::new("POST", url("/api/auth"))
            .with_body(r#"{"name":null,"email":42,"password":"b"}"#);
        let res = send(req).unwrap().unwrap();
        assert_eq!(res.status, 201);
        let body = res.body_json().unwrap();
        assert_eq!(body["user"]["name"], Value::Null);
        assert_eq!(body["user"]["email"], json!(42));
        assert_eq!(body["user"]["id"], json!(5));
        assert_eq!(body["token"], "newusertoken");
    }

    #[test]
    fn test_register_requires_name() {
        let req = MockRequest::new("POST", url("/api/auth"))
            .with_body(r#"{"email":"x@y.z","password":"b"}"#);
        assert!(matches!(send(req).unwrap_err(), MockError::MissingProperty { ref property, .. } if property == "name"));
    }

    #[test]
    fn test_auth_unhandled_method() {
        let err = send(MockRequest::new("PATCH", url("/api/auth"))).unwrap_err();
        assert!(matches!(err, MockError::Unhandled { .. }));
        assert!(err.to_string().contains("Missing mock implementation"));
    }

    #[test]
    fn test_place_order() {
        let body = json!({
            "items": [
                { "menuId": 1, "description": "Veggie", "price": 0.0038 },
                { "menuId": 2, "description": "Pepperoni", "price": 0.0042 },
            ],
            "storeId": "4",
            "franchiseId": 2,
        });
        let req = MockRequest::new("POST", url("/api/order")).with_json(&body).unwrap();
        let res = send(req).unwrap().unwrap();
        let placed: OrderPlaced = serde_json::from_slice(&res.body).unwrap();
        assert_eq!(placed.order.id, 23);
        assert_eq!(placed.jwt, "eyJpYXQ");
    }

    #[test]
    fn test_place_order_body_mismatch() {
        let body = json!({
            "items": [{ "menuId": 1, "description": "Veggie", "price": 0.0038 }],
            "storeId": "4",
            "franchiseId": 2,
        });
        let req = MockRequest::new("POST", url("/api/order")).with_json(&body).unwrap();
        let err = send(req).unwrap_err();
        assert!(matches!(err, MockError::BodyMismatch { ref path, .. } if path == "$.items"));
    }

    #[test]
    fn test_order_history() {
        let res = send(MockRequest::new("GET", url("/api/order"))).unwrap().unwrap();
        let history = res.body_json().unwrap();
        assert_eq!(history[0]["status"], "Completed");
        assert_eq!(history[0]["date"], "2023-10-15T12:34:56Z");
    }

    #[test]
    fn test_order_unhandled_method() {
        let err = send(MockRequest::new("DELETE", url("/api/order"))).unwrap_err();
        assert!(matches!(err, MockError::Unhandled { .. }));
    }

    #[test]
    fn test_claims() {
        let router = router();
        assert!(router.claims(&url("/api/order/menu")));
        assert!(router.claims(&url("/api/auth")));
        assert!(!router.claims(&url("/api/docs")));
        assert!(!MockRouter::new().claims(&url("/api/auth")));
    }

    #[test]
    fn test_unmatched_url_passes_through() {
        assert!(send(MockRequest::new("GET", url("/api/docs"))).unwrap().is_none());
        assert!(send(MockRequest::new("POST", url("/api/order/verify"))).unwrap().is_none());
        assert!(send(MockRequest::new("GET", url("/no-exist"))).unwrap().is_none());
    }

    #[test]
    fn test_later_route_takes_precedence() {
        struct Teapot;
        impl RouteHandler for Teapot {
            fn route(&self) -> &str {
                "/api/order/menu"
            }
            fn handle(&self, _req: &MockRequest) -> MockResult<MockResponse> {
                MockResponse::json(418, &json!({}))
            }
        }

        let mut router = router();
        router.route(MENU_ROUTE, Teapot).unwrap();
        let res = router
            .dispatch(&MockRequest::new("GET", url("/api/order/menu")))
            .unwrap()
            .unwrap();
        assert_eq!(res.status, 418);
        assert_eq!(router.patterns().len(), 5);
    }
}
