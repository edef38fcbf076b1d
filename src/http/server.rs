//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create Axum Router for the mount prefix (and admin API when enabled)
//! - Wire up middleware (request ID, tracing)
//! - Gate every proxied request on the circuit breaker before forwarding
//! - Forward admitted requests to the upstream with a deadline
//! - Report each outcome back to the breaker and relay the response

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin;
use crate::config::{validate_config, ConfigError, GatewayConfig};
use crate::http::proxy::{endpoint_key, Upstream};
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::http::response;
use crate::observability::metrics;
use crate::resilience::{call_with_deadline, CircuitBreakerRegistry};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CircuitBreakerRegistry>,
    pub upstream: Arc<Upstream>,
    pub client: Client<HttpConnector, Body>,
    pub request_timeout: Duration,
    pub config: Arc<GatewayConfig>,
}

/// The gateway: an HTTP listener fronting one upstream, guarded per endpoint.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    registry: Arc<CircuitBreakerRegistry>,
}

impl GatewayServer {
    /// Validate the configuration and assemble the gateway.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let upstream = Upstream::from_config(&config.upstream)
            .map_err(|e| ConfigError::Validation(vec![e]))?;

        let registry = Arc::new(CircuitBreakerRegistry::from_config(&config.breaker));
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            registry: registry.clone(),
            upstream: Arc::new(upstream),
            client,
            request_timeout: config.upstream.request_timeout(),
            config: Arc::new(config.clone()),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            registry,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let prefix = config.upstream.mount_prefix.trim_end_matches('/');
        let mut router = if prefix.is_empty() {
            Router::new()
                .route("/", any(proxy_handler))
                .route("/{*path}", any(proxy_handler))
        } else {
            Router::new()
                .route(prefix, any(proxy_handler))
                .route(&format!("{}/", prefix), any(proxy_handler))
                .route(&format!("{}/{{*path}}", prefix), any(proxy_handler))
        };

        if config.admin.enabled {
            router = router.merge(admin::admin_router(state.clone()));
        }

        router
            .fallback(not_found)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            mount_prefix = %self.config.upstream.mount_prefix,
            fail_threshold = self.config.breaker.fail_threshold,
            cooldown_ms = self.config.breaker.cooldown_ms,
            "Gateway listening"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The breaker registry shared by all requests.
    pub fn registry(&self) -> Arc<CircuitBreakerRegistry> {
        self.registry.clone()
    }
}

/// Proxy handler: admission gate, forward, outcome report, relay.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().clone();
    let key = endpoint_key(&method, request.uri());

    tracing::debug!(request_id = %request_id, endpoint = %key, "Proxying request");

    if !state.registry.admit(&key) {
        tracing::warn!(request_id = %request_id, endpoint = %key, "Circuit open, request rejected");
        metrics::record_rejection();
        metrics::record_request(method.as_str(), 503, start_time);
        return response::rejected();
    }

    let upstream_request = match state.upstream.prepare(request) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = %request_id, endpoint = %key, error = %e, "Failed to build upstream request");
            metrics::record_request(method.as_str(), 400, start_time);
            return (StatusCode::BAD_REQUEST, "Invalid request").into_response();
        }
    };

    match call_with_deadline(state.request_timeout, state.client.request(upstream_request)).await {
        Ok(upstream_response) => {
            let status = upstream_response.status();
            if status.as_u16() >= 400 {
                state.registry.report_failure(&key);
            } else {
                state.registry.report_success(&key);
            }

            tracing::debug!(request_id = %request_id, endpoint = %key, status = %status, "Upstream responded");
            metrics::record_request(method.as_str(), status.as_u16(), start_time);
            response::relay(upstream_response)
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, endpoint = %key, error = %e, "Upstream error");
            state.registry.report_failure(&key);
            metrics::record_upstream_error(e.kind());

            let response = response::upstream_failed(&e);
            metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
            response
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "No matching route found")
}
