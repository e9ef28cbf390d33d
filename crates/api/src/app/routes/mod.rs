use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::app::AppState;
use crate::middleware::{GateState, admission_middleware};

pub mod forward;
pub mod system;
pub mod table;
pub mod webhook;

/// Router for every forwarded endpoint, one nested group per service.
pub fn router(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();

    for group in table::GROUPS {
        let mut routes = Router::new();
        for route in group.routes {
            routes = routes.route(route.path, forward::forwarder(group.service, route));
        }

        if let Some(required) = group.role {
            let gate = GateState {
                gate: state.gate.clone(),
                required,
            };
            routes = routes.route_layer(axum::middleware::from_fn_with_state(gate, admission_middleware));
        }

        // Outside admission, so preflights never need a credential.
        if group.cors {
            routes = routes.layer(cors_layer(&state.cors_allowed_origins));
        }

        router = router.nest(group.prefix, routes);
    }

    router
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::AUTHORIZATION])
}
