use axum::{Json, extract::State};
use serde_json::{Value as JsonValue, json};

use zyra_core::ServiceName;
use zyra_infra::breaker::CircuitState;

use crate::app::AppState;

/// GET /health: gateway liveness plus the breaker state of every service.
pub async fn health(State(state): State<AppState>) -> Json<JsonValue> {
    let breakers = state.executor.breakers();
    let services: Vec<_> = ServiceName::ALL.iter().map(|s| breakers.snapshot(*s)).collect();

    let status = if services.iter().all(|s| s.state == CircuitState::Closed) {
        "healthy"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "services": services,
    }))
}
