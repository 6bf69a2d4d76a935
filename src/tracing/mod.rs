//! Request correlation and HTTP trace spans.
//!
//! Every request gets an id, taken from `x-request-id` when the caller sent
//! one. The id is attached to the request span, echoed on the response and
//! available to error bodies through [`current_request_id`].

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use std::{cell::RefCell, fmt, future::Future, time::Duration};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    trace::{DefaultOnFailure, MakeSpan, OnResponse, TraceLayer},
};
use tracing::{info, warn, Span};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id we propagate.
const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts a caller id when it is printable ASCII and reasonably short.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let acceptable = !raw.is_empty()
            && raw.len() <= MAX_REQUEST_ID_LEN
            && raw.bytes().all(|b| b.is_ascii_graphic());
        acceptable.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

tokio::task_local! {
    static REQUEST_ID: RefCell<Option<RequestId>>;
}

/// Runs `future` with `request_id` visible to [`current_request_id`].
pub async fn scope_request_id<Fut, R>(request_id: RequestId, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    REQUEST_ID.scope(RefCell::new(Some(request_id)), future).await
}

pub fn current_request_id() -> Option<RequestId> {
    REQUEST_ID.try_with(|id| id.borrow().clone()).ok().flatten()
}

fn incoming_request_id<B>(request: &Request<B>) -> Option<RequestId> {
    request
        .headers()
        .get(REQUEST_ID_HEADER)?
        .to_str()
        .ok()
        .and_then(RequestId::parse)
}

pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let request_id = incoming_request_id(&request).unwrap_or_else(RequestId::generate);
    request.extensions_mut().insert(request_id.clone());

    let mut response = scope_request_id(request_id.clone(), next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Span per request, keyed by the matched route so load ids stay out of
/// the span name.
#[derive(Clone, Copy, Default)]
pub struct PortalSpan;

impl<B> MakeSpan<B> for PortalSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_owned())
            .unwrap_or_else(|| request.uri().path().to_owned());
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .cloned()
            .or_else(|| incoming_request_id(request))
            .unwrap_or_else(RequestId::generate);

        tracing::info_span!(
            "http.request",
            request_id = %request_id,
            method = %request.method(),
            route = %route,
            uri = %request.uri(),
        )
    }
}

/// Logs completed requests, warning on client errors.
#[derive(Clone, Copy, Default)]
pub struct LogResponse;

impl<B> OnResponse<B> for LogResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
        let status = response.status();
        let latency_ms = latency.as_millis() as u64;
        if status.is_client_error() {
            warn!(status = status.as_u16(), latency_ms, "request rejected");
        } else {
            info!(status = status.as_u16(), latency_ms, "request finished");
        }
    }
}

pub type PortalTraceLayer =
    TraceLayer<SharedClassifier<ServerErrorsAsFailures>, PortalSpan, (), LogResponse, (), (), DefaultOnFailure>;

/// Trace layer for the router. 5xx responses are reported as failures.
pub fn configure_http_tracing() -> PortalTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(PortalSpan)
        .on_request(())
        .on_response(LogResponse)
        .on_body_chunk(())
        .on_eos(())
}
