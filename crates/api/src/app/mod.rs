//! HTTP application wiring (Axum router + shared state).
//!
//! - `routes/`: route table, forwarding handler, webhook and system endpoints
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;

use zyra_auth::{AuthGate, WebhookVerifier};
use zyra_infra::channels::ChannelRegistry;
use zyra_infra::dispatch::DispatchExecutor;

pub mod errors;
pub mod routes;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthGate>,
    pub executor: DispatchExecutor,
    pub channels: Arc<ChannelRegistry>,
    /// `None` answers `POST /webhook` with 503.
    pub webhook: Option<Arc<dyn WebhookVerifier>>,
    pub cors_allowed_origins: Arc<[String]>,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .route("/webhook", post(routes::webhook::receive))
        .merge(routes::router(&state))
        .layer(ServiceBuilder::new())
        .with_state(state)
}
