//! Per-request context: request ID and client address.
//!
//! The request ID is taken from `x-request-id` or generated, echoed on the
//! response and used to correlate log lines. The client address is what the
//! network allow-list sees.

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{HeaderMap, HeaderValue, request::Parts},
    middleware::Next,
    response::Response,
};
use std::{net::SocketAddr, time::Instant};
use uuid::Uuid;

use crate::{logging, metrics};

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Proxy-appended client chain
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Generate or extract request ID from headers
fn get_or_generate_request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Middleware to add request ID to all requests and responses
///
/// Also logs request start/completion and counts the request in
/// `http_requests_total`.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = get_or_generate_request_id(request.headers());

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %request.uri(),
        "Request started"
    );

    let response = next.run(request).await;

    let (mut parts, body) = response.into_parts();
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(REQUEST_ID_HEADER, header_value);
    }

    let status = parts.status.as_u16();
    tracing::info!(
        request_id = %request_id,
        status = %parts.status,
        "Request completed"
    );
    logging::log_api_request(
        &method,
        &path,
        status,
        u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    );
    metrics::http_requests_total(&method, status);

    Response::from_parts(parts, body)
}

/// Raw client address as seen by the server
///
/// The left-most `x-forwarded-for` token when the header is present,
/// otherwise the socket peer. The value is passed through unnormalised; the
/// admission engine normalises it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientAddress(pub String);

impl ClientAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the address of a request seen by a middleware
    pub fn from_request(request: &Request) -> Self {
        let peer = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self::from_parts(request.headers(), peer)
    }

    fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match (forwarded, peer) {
            (Some(origin), _) => ClientAddress(origin.to_string()),
            (None, Some(peer)) => ClientAddress(peer.ip().to_string()),
            (None, None) => ClientAddress(String::new()),
        }
    }
}

impl<S> FromRequestParts<S> for ClientAddress
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientAddress::from_parts(&parts.headers, peer))
    }
}
