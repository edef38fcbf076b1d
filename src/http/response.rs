//! Response handling.
//!
//! # Responsibilities
//! - Relay the upstream response to the client (status, headers, body)
//! - Strip hop-by-hop headers in both directions
//! - Map breaker rejections and upstream errors to status codes
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Rejected by an open circuit → 503 Service Unavailable
//! - Transport errors → 502 Bad Gateway, timeouts → 504 Gateway Timeout

use axum::{
    body::Body,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;

use crate::resilience::UpstreamError;

/// Body sent when an open circuit refuses a request.
pub const REJECTED_BODY: &str = "Service unavailable";

/// Headers that describe a single connection and must not be forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "upgrade",
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove(header::TRANSFER_ENCODING);
}

/// Relay an upstream response unchanged apart from hop-by-hop headers.
pub fn relay(response: hyper::Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}

/// Response for a request refused by an open circuit.
pub fn rejected() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, REJECTED_BODY).into_response()
}

/// Generic response when the upstream produced no response at all.
pub fn upstream_failed(error: &UpstreamError) -> Response {
    match error {
        UpstreamError::Timeout(_) => {
            (StatusCode::GATEWAY_TIMEOUT, "Upstream timed out").into_response()
        }
        UpstreamError::Transport(_) => {
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
