//! Client-side request interception
//!
//! Pauses every `/api/` request through the CDP Fetch domain and answers
//! it from a [`MockRouter`]. Requests no route claims continue to the
//! network. Handler failures fail the request in the page and are queued
//! so the runner can abort the scenario at the current step.
//!
//! Fetch interception also pauses CORS preflights, so `OPTIONS` requests
//! to claimed routes are answered here with permissive CORS headers that
//! echo the page origin.

use std::sync::Arc;

use base64::Engine;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FailRequestParams,
    FulfillRequestParams, HeaderEntry, RequestId, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{self, ErrorReason, GetRequestPostDataParams};
use chromiumoxide::Page;
use futures::StreamExt;
use parking_lot::Mutex;
use pizza_common::{MockError, MockRequest, MockResponse, MockRouter};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{E2eError, E2eResult};

/// CDP-side filter; exact matching happens against the router's globs
pub const INTERCEPT_URL_PATTERN: &str = "*/api/*";

/// Methods advertised to a preflight that does not name one
const PREFLIGHT_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS, PATCH";

/// A paused request plus the headers CORS answers depend on
#[derive(Debug, Clone)]
pub struct PausedRequest {
    pub request: MockRequest,
    pub origin: Option<String>,
    /// `Access-Control-Request-Method`
    pub preflight_method: Option<String>,
    /// `Access-Control-Request-Headers`
    pub preflight_headers: Option<String>,
}

impl PausedRequest {
    pub fn new(request: MockRequest) -> Self {
        Self {
            request,
            origin: None,
            preflight_method: None,
            preflight_headers: None,
        }
    }

    pub fn from_network(req: &network::Request) -> Self {
        Self {
            request: mock_request(req),
            origin: header(req, "origin").map(String::from),
            preflight_method: header(req, "access-control-request-method").map(String::from),
            preflight_headers: header(req, "access-control-request-headers").map(String::from),
        }
    }

    fn is_preflight(&self) -> bool {
        self.request.method == "OPTIONS"
    }
}

/// Convert a CDP request, decoding the base64 post data entries.
pub fn mock_request(req: &network::Request) -> MockRequest {
    let request = MockRequest::new(req.method.clone(), req.url.clone());
    match post_data(req) {
        Some(body) => request.with_body(body),
        None => request,
    }
}

fn post_data(req: &network::Request) -> Option<String> {
    let entries = req.post_data_entries.as_ref()?;
    let mut bytes = Vec::new();
    for entry in entries {
        let Some(chunk) = &entry.bytes else { continue };
        let encoded: &str = chunk.as_ref();
        match base64::engine::general_purpose::STANDARD.decode(encoded) {
            Ok(decoded) => bytes.extend_from_slice(&decoded),
            Err(e) => warn!("Undecodable post data entry for {}: {}", req.url, e),
        }
    }
    if bytes.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Case-insensitive request header lookup
fn header<'a>(req: &'a network::Request, name: &str) -> Option<&'a str> {
    req.headers
        .inner()
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.as_str())
}

/// What to do with a paused request
#[derive(Debug)]
pub enum Interception {
    Fulfill(MockResponse),
    Preflight,
    Continue,
    Fail(MockError),
}

pub fn decide(router: &MockRouter, req: &PausedRequest) -> Interception {
    if req.is_preflight() {
        return if router.claims(&req.request.url) {
            Interception::Preflight
        } else {
            Interception::Continue
        };
    }
    match router.dispatch(&req.request) {
        Ok(Some(res)) => Interception::Fulfill(res),
        Ok(None) => Interception::Continue,
        Err(e) => Interception::Fail(e),
    }
}

/// One intercepted request and its outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub method: String,
    pub url: String,
    pub mocked: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
}

#[derive(Default)]
struct InterceptLog {
    exchanges: Vec<Exchange>,
    failures: Vec<MockError>,
}

impl InterceptLog {
    fn record(&mut self, req: &MockRequest, decision: &Interception) {
        let (mocked, status, error) = match decision {
            Interception::Fulfill(res) => (true, Some(res.status), None),
            Interception::Preflight => (true, Some(204), None),
            Interception::Continue => (false, None, None),
            Interception::Fail(e) => (true, None, Some(e.to_string())),
        };
        self.exchanges.push(Exchange {
            method: req.method.clone(),
            url: req.url.clone(),
            mocked,
            status,
            error,
        });
    }
}

/// Running interceptor bound to one page
pub struct Interceptor {
    log: Arc<Mutex<InterceptLog>>,
    task: JoinHandle<()>,
}

impl Interceptor {
    /// Enable interception on `page`; must run before the first navigation.
    pub async fn install(page: Page, router: MockRouter) -> E2eResult<Self> {
        let mut events = page.event_listener::<EventRequestPaused>().await?;

        page.execute(
            EnableParams::builder()
                .pattern(RequestPattern::builder().url_pattern(INTERCEPT_URL_PATTERN).build())
                .build(),
        )
        .await?;

        debug!("Request interception enabled for {:?}", router.patterns());

        let log = Arc::new(Mutex::new(InterceptLog::default()));
        let task_log = log.clone();

        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let mut paused = PausedRequest::from_network(&event.request);
                if paused.request.body.is_none() && event.request.has_post_data == Some(true) {
                    if let Some(body) = fetch_post_data(&page, &event).await {
                        paused.request = paused.request.with_body(body);
                    }
                }

                let decision = decide(&router, &paused);
                task_log.lock().record(&paused.request, &decision);

                let request_id = event.request_id.clone();
                let req = &paused.request;
                let outcome = match decision {
                    Interception::Fulfill(res) => {
                        match fulfill_params(request_id, &res, paused.origin.as_deref()) {
                            Ok(params) => page.execute(params).await.map(|_| ()),
                            Err(reason) => {
                                error!("Could not build fulfilment for {}: {}", req.url, reason);
                                continue;
                            }
                        }
                    }
                    Interception::Preflight => match preflight_params(request_id, &paused) {
                        Ok(params) => page.execute(params).await.map(|_| ()),
                        Err(reason) => {
                            error!("Could not build preflight answer for {}: {}", req.url, reason);
                            continue;
                        }
                    },
                    Interception::Continue => page
                        .execute(ContinueRequestParams::new(request_id))
                        .await
                        .map(|_| ()),
                    Interception::Fail(e) => {
                        error!("{} {} failed: {}", req.method, req.url, e);
                        task_log.lock().failures.push(e);
                        page.execute(FailRequestParams::new(request_id, ErrorReason::Failed))
                            .await
                            .map(|_| ())
                    }
                };

                if let Err(e) = outcome {
                    warn!("Interception reply for {} {} failed: {}", req.method, req.url, e);
                }
            }
            debug!("Request interception stream closed");
        });

        Ok(Self { log, task })
    }

    /// Fail with the first queued route failure, if any.
    pub fn check(&self) -> E2eResult<()> {
        let mut log = self.log.lock();
        if log.failures.is_empty() {
            return Ok(());
        }
        let first = log.failures.remove(0);
        log.failures.clear();
        Err(E2eError::MockRoute(first))
    }

    pub fn exchanges(&self) -> Vec<Exchange> {
        self.log.lock().exchanges.clone()
    }
}

impl Drop for Interceptor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Large bodies are left out of the paused event and must be asked for.
async fn fetch_post_data(page: &Page, event: &EventRequestPaused) -> Option<String> {
    let network_id = event.network_id.clone()?;
    match page.execute(GetRequestPostDataParams::new(network_id)).await {
        Ok(res) => Some(res.result.post_data),
        Err(e) => {
            warn!("Could not read post data for {}: {}", event.request.url, e);
            None
        }
    }
}

fn cors_headers(origin: Option<&str>) -> Vec<HeaderEntry> {
    match origin {
        Some(origin) => vec![
            HeaderEntry::new("Access-Control-Allow-Origin", origin),
            HeaderEntry::new("Access-Control-Allow-Credentials", "true"),
            HeaderEntry::new("Vary", "Origin"),
        ],
        None => vec![HeaderEntry::new("Access-Control-Allow-Origin", "*")],
    }
}

fn fulfill_params(
    request_id: RequestId,
    res: &MockResponse,
    origin: Option<&str>,
) -> Result<FulfillRequestParams, String> {
    let body = base64::engine::general_purpose::STANDARD.encode(&res.body);
    let mut headers = vec![HeaderEntry::new("Content-Type", res.content_type.clone())];
    headers.extend(cors_headers(origin));
    FulfillRequestParams::builder()
        .request_id(request_id)
        .response_code(res.status as i64)
        .response_headers(headers)
        .body(body)
        .build()
}

fn preflight_params(request_id: RequestId, req: &PausedRequest) -> Result<FulfillRequestParams, String> {
    let mut headers = cors_headers(req.origin.as_deref());
    headers.push(HeaderEntry::new(
        "Access-Control-Allow-Methods",
        req.preflight_method.as_deref().unwrap_or(PREFLIGHT_METHODS),
    ));
    headers.push(HeaderEntry::new(
        "Access-Control-Allow-Headers",
        req.preflight_headers.as_deref().unwrap_or("*"),
    ));
    FulfillRequestParams::builder()
        .request_id(request_id)
        .response_code(204)
        .response_headers(headers)
        .build()
}
