//! Admin API.
//!
//! Read-only views of the gateway and its breaker registry, mounted on the
//! gateway listener when `admin.enabled` is set. Never mutates breaker state.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use crate::http::server::AppState;
use self::auth::admin_auth_middleware;
use self::handlers::{get_circuits, get_status};

pub fn admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/circuits", get(get_circuits))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
