use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use zyra_auth::RejectReason;
use zyra_infra::dispatch::DispatchError;

pub fn rejection_response(reason: RejectReason) -> axum::response::Response {
    let status = StatusCode::from_u16(reason.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_error(status, reason.code(), reason.message())
}

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::ServiceUnavailable => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "service_unavailable",
            "service temporarily unavailable",
        ),
        DispatchError::DownstreamFailed { detail } => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "downstream_failed", detail)
        }
        DispatchError::Timeout => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "downstream_timeout",
            "downstream call timed out",
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_keep_their_status() {
        assert_eq!(
            rejection_response(RejectReason::RoleMismatch).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            rejection_response(RejectReason::SessionRevoked).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            rejection_response(RejectReason::AdmissionUnavailable).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn dispatch_failures_are_unavailable() {
        for err in [
            DispatchError::ServiceUnavailable,
            DispatchError::Timeout,
            DispatchError::DownstreamFailed {
                detail: "downstream_unreachable".to_string(),
            },
        ] {
            assert_eq!(
                dispatch_error_to_response(err).status(),
                StatusCode::SERVICE_UNAVAILABLE
            );
        }
    }
}
