//! HTTP ingress: routing, authentication, request validation, and response
//! mapping.

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::dispatch::Dispatcher;
use crate::services::{AuthService, ShipmentService};

pub mod auth;
pub mod error;
pub mod events;
pub mod health;
pub mod middleware;
pub mod shipments;
pub mod validate;

pub use error::ApiError;
pub use health::ReadinessTargets;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub shipments: Arc<ShipmentService>,
    pub auth: Arc<AuthService>,
    /// Raw store handles for the readiness probe; `None` in tests.
    pub readiness: Option<ReadinessTargets>,
}

/// Build the full application router.
///
/// `/health*` and `/auth/*` are public; everything under `/v1/` requires a
/// bearer token.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected = Router::new()
        .route("/v1/events", post(events::receive))
        .route("/v1/events/batch", post(events::receive_batch))
        .route("/v1/shipments", post(shipments::create).get(shipments::list))
        .route("/v1/shipments/:tracking_number", get(shipments::get))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests;
