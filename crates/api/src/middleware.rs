use std::sync::Arc;

use axum::{extract::State, middleware::Next, response::Response};

use zyra_auth::{AdmissionDecision, AuthGate, Role};

use crate::app::errors;
use crate::context::SubjectContext;

/// Admission settings for one route group.
#[derive(Clone)]
pub struct GateState {
    pub gate: Arc<AuthGate>,
    pub required: Role,
}

pub async fn admission_middleware(
    State(state): State<GateState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    // A missing or non-ASCII header is handed over as empty and rejected by the gate.
    let authorization = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();

    match state.gate.admit(&authorization, state.required).await {
        AdmissionDecision::Admitted { subject_id, role } => {
            req.extensions_mut().insert(SubjectContext::new(subject_id, role));
            next.run(req).await
        }
        AdmissionDecision::Rejected { reason, .. } => errors::rejection_response(reason),
    }
}
