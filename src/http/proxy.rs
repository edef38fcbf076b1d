//! Upstream target and request preparation.
//!
//! # Responsibilities
//! - Derive the endpoint key a request is tracked under
//! - Rewrite the request URI onto the configured upstream base URL
//! - Strip hop-by-hop headers and optionally rewrite `Host`

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, Uri, Version},
};
use url::Url;

use crate::config::{UpstreamConfig, ValidationError};
use crate::http::response::strip_hop_by_hop;

/// Key under which breaker state is tracked: `METHOD:PATH?QUERY`, as observed.
pub fn endpoint_key(method: &Method, uri: &Uri) -> String {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    format!("{}:{}", method, path)
}

/// The single upstream every admitted request is forwarded to.
#[derive(Debug, Clone)]
pub struct Upstream {
    scheme: String,
    authority: String,
    /// Path carried by the base URL, without trailing slash.
    base_path: String,
    change_origin: bool,
}

impl Upstream {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ValidationError> {
        let url = Url::parse(&config.base_url)
            .map_err(|_| ValidationError::UpstreamUrl(config.base_url.clone()))?;
        let host = url
            .host_str()
            .ok_or_else(|| ValidationError::UpstreamUrl(config.base_url.clone()))?;
        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        Ok(Self {
            scheme: url.scheme().to_string(),
            authority,
            base_path: url.path().trim_end_matches('/').to_string(),
            change_origin: config.change_origin,
        })
    }

    /// `host[:port]` of the upstream.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Absolute upstream URI for an incoming path and query.
    pub fn target_uri(&self, path_and_query: &str) -> Result<Uri, axum::http::Error> {
        Uri::builder()
            .scheme(self.scheme.as_str())
            .authority(self.authority.as_str())
            .path_and_query(format!("{}{}", self.base_path, path_and_query))
            .build()
    }

    /// Turn an incoming request into the request sent upstream. The body is
    /// streamed through untouched.
    pub fn prepare(&self, request: Request<Body>) -> Result<Request<Body>, axum::http::Error> {
        let (mut parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| "/".to_string());
        parts.uri = self.target_uri(&path_and_query)?;
        parts.version = Version::HTTP_11;

        strip_hop_by_hop(&mut parts.headers);
        if self.change_origin {
            parts
                .headers
                .insert(header::HOST, HeaderValue::from_str(&self.authority)?);
        }

        Ok(Request::from_parts(parts, body))
    }
}
