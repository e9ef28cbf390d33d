//! `POST /webhook`: payment events, authenticated by signature rather than
//! bearer credential, forwarded to the client service.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde_json::json;
use tracing::{info, warn};

use zyra_core::ServiceName;
use zyra_infra::channels::RpcRequest;

use crate::app::{AppState, errors};

use super::forward::dispatch_to;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";
pub const CALL: &str = "HandleStripeEvent";

pub async fn receive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(verifier) = state.webhook.clone() else {
        return errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "webhook_not_configured",
            "webhook secret is not configured",
        );
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let event = match verifier.verify(&body, signature) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "webhook rejected");
            return errors::json_error(
                StatusCode::UNAUTHORIZED,
                "invalid_webhook_signature",
                "webhook signature verification failed",
            );
        }
    };

    info!(event_type = %event.event_type, "webhook accepted");

    let request = RpcRequest {
        call: CALL.to_string(),
        subject_id: None,
        payload: json!({
            "event_type": event.event_type,
            "payload": event.payload,
        }),
    };

    dispatch_to(&state, ServiceName::Client, request).await
}
