//! Mock backend server
//!
//! Every request under `/api` is handed to the shared [`MockRouter`], so
//! the frontend sees exactly the payloads the browser harness would
//! inject.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use pizza_common::{ErrorBody, MockRequest, MockResponse, MockResult, MockRouter};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Largest request body the server will buffer
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Mock server state
#[derive(Clone)]
pub struct MockServer {
    routes: Arc<MockRouter>,
}

impl MockServer {
    pub fn new(routes: MockRouter) -> Self {
        Self {
            routes: Arc::new(routes),
        }
    }

    /// Server preloaded with the pizza fixtures
    pub fn pizza() -> MockResult<Self> {
        Ok(Self::new(MockRouter::pizza()?))
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/api/*rest", any(api_handler))
            .fallback(not_found_handler)
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .layer(TraceLayer::new_for_http())
            .with_state(self.clone())
    }

    /// Start the server
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        self.serve_listener(listener).await
    }

    /// Serve on an already bound listener (port 0 in tests)
    pub async fn serve_listener(self, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
        info!("Mock backend listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "pizza-mock-web"
    }))
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: "Not Found".to_string(),
        }),
    )
}

async fn api_handler(State(server): State<MockServer>, req: Request) -> Response {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
        .to_string();
    let url = format!("http://{}{}", host, req.uri());
    let method = req.method().as_str().to_string();

    let bytes = match to_bytes(req.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, format!("Failed to read body: {}", e));
        }
    };

    let mut mock_req = MockRequest::new(method, url);
    if !bytes.is_empty() {
        mock_req = mock_req.with_body(String::from_utf8_lossy(&bytes).into_owned());
    }

    match server.routes.dispatch(&mock_req) {
        Ok(Some(res)) => {
            debug!("{} {} -> {}", mock_req.method, mock_req.url, res.status);
            into_response(res)
        }
        Ok(None) => not_found_handler().await.into_response(),
        Err(e) => {
            error!("Mock route failure for {} {}: {}", mock_req.method, mock_req.url, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn into_response(res: MockResponse) -> Response {
    let status = StatusCode::from_u16(res.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, res.content_type)], Body::from(res.body)).into_response()
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}
