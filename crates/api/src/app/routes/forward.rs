//! Generic forwarding handler: request → `RpcRequest` → executor → response.

use std::collections::HashMap;

use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{MethodRouter, on},
};
use serde_json::Value as JsonValue;
use tracing::error;

use zyra_core::ServiceName;
use zyra_infra::channels::{RpcRequest, RpcResponse};

use crate::app::{AppState, errors};
use crate::context::SubjectContext;

use super::table::Route;

pub fn forwarder(service: ServiceName, route: &'static Route) -> MethodRouter<AppState> {
    on(
        route.verb.filter(),
        move |State(state): State<AppState>,
              subject: Option<Extension<SubjectContext>>,
              Query(query): Query<HashMap<String, String>>,
              body: Bytes| async move {
            let subject = subject.map(|Extension(s)| s);
            forward(state, service, route, subject, query, body).await
        },
    )
}

async fn forward(
    state: AppState,
    service: ServiceName,
    route: &'static Route,
    subject: Option<SubjectContext>,
    query: HashMap<String, String>,
    body: Bytes,
) -> Response {
    let payload = match payload_for(route, query, &body) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let request = RpcRequest {
        call: route.call.to_string(),
        subject_id: subject.map(|s| s.subject_id().clone()),
        payload,
    };

    dispatch_to(&state, service, request).await
}

/// Send `request` to `service` through the breaker-guarded executor and turn
/// the outcome into an HTTP response.
pub async fn dispatch_to(state: &AppState, service: ServiceName, request: RpcRequest) -> Response {
    let channel = match state.channels.get(service) {
        Ok(c) => c,
        Err(e) => {
            error!(%service, error = %e, "no downstream channel");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "channel_missing",
                "downstream channel not configured",
            );
        }
    };

    match state
        .executor
        .dispatch(service, move || async move { channel.call(request).await })
        .await
    {
        Ok(response) => passthrough(response),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

fn payload_for(route: &Route, query: HashMap<String, String>, body: &[u8]) -> Result<JsonValue, Response> {
    if route.verb.reads_query() {
        let map = query.into_iter().map(|(k, v)| (k, JsonValue::String(v))).collect();
        return Ok(JsonValue::Object(map));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonValue::Object(Default::default()));
    }

    serde_json::from_slice(body)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.to_string()))
}

fn passthrough(response: RpcResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(response.body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::routes::table::Verb;

    const GET: Route = Route {
        verb: Verb::Get,
        path: "/vendors",
        call: "GetVendorsByCategory",
    };
    const POST: Route = Route {
        verb: Verb::Post,
        path: "/booking",
        call: "BookVendor",
    };

    #[test]
    fn get_payload_is_the_query() {
        let query = HashMap::from([("category".to_string(), "catering".to_string())]);
        let payload = payload_for(&GET, query, b"ignored").unwrap();
        assert_eq!(payload, serde_json::json!({ "category": "catering" }));
    }

    #[test]
    fn empty_body_becomes_empty_object() {
        let payload = payload_for(&POST, HashMap::new(), b"  ").unwrap();
        assert_eq!(payload, serde_json::json!({}));
    }

    #[test]
    fn malformed_body_is_bad_request() {
        let resp = payload_for(&POST, HashMap::new(), b"{not json").unwrap_err();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn downstream_status_is_kept() {
        let resp = passthrough(RpcResponse {
            status: 404,
            body: serde_json::json!({ "error": "no such booking" }),
        });
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
