use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::HalfOpenPolicy;
use crate::http::server::AppState;
use crate::resilience::EndpointSnapshot;

#[derive(Serialize)]
pub struct GatewayStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub upstream: String,
    pub fail_threshold: u32,
    pub cooldown_ms: u64,
    pub half_open: HalfOpenPolicy,
    pub tracked_endpoints: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<GatewayStatus> {
    Json(GatewayStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        upstream: state.config.upstream.base_url.clone(),
        fail_threshold: state.registry.fail_threshold(),
        cooldown_ms: state.registry.cooldown().as_millis() as u64,
        half_open: state.registry.half_open_policy(),
        tracked_endpoints: state.registry.len(),
    })
}

pub async fn get_circuits(State(state): State<AppState>) -> Json<Vec<EndpointSnapshot>> {
    Json(state.registry.snapshot())
}
