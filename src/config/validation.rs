//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the upstream URL is something the HTTP client can reach
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("upstream.base_url `{0}` is not a valid URL")]
    UpstreamUrl(String),

    #[error("upstream.base_url scheme `{0}` is not supported (use http)")]
    UpstreamScheme(String),

    #[error("upstream.base_url must not carry a query or fragment")]
    UpstreamQuery,

    #[error("upstream.mount_prefix `{0}` must start with `/` and contain no `{{`, `}}` or `*`")]
    MountPrefix(String),

    #[error("upstream.request_timeout_ms must be greater than zero")]
    RequestTimeout,

    #[error("breaker.cooldown_ms must be greater than zero")]
    Cooldown,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),

    #[error("admin.api_key must be set when the admin API is enabled")]
    AdminKey,
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) => {
            if url.scheme() != "http" {
                errors.push(ValidationError::UpstreamScheme(url.scheme().to_string()));
            }
            if url.host_str().is_none() {
                errors.push(ValidationError::UpstreamUrl(config.upstream.base_url.clone()));
            }
            if url.query().is_some() || url.fragment().is_some() {
                errors.push(ValidationError::UpstreamQuery);
            }
        }
        Err(_) => errors.push(ValidationError::UpstreamUrl(config.upstream.base_url.clone())),
    }

    let prefix = &config.upstream.mount_prefix;
    if !prefix.starts_with('/') || prefix.contains(['{', '}', '*']) {
        errors.push(ValidationError::MountPrefix(prefix.clone()));
    }

    if config.upstream.request_timeout_ms == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    if config.breaker.cooldown_ms == 0 {
        errors.push(ValidationError::Cooldown);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::AdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
