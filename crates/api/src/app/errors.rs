use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use retone_infra::DispatchError;
use retone_infra::jobs::SchedulerError;

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Validation(e) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        DispatchError::Rejected(e @ SchedulerError::QueueFull { .. }) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "queue_full", e.to_string())
        }
        DispatchError::Rejected(e @ SchedulerError::ShuttingDown) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "shutting_down", e.to_string())
        }
        e @ DispatchError::Timeout { .. } => {
            json_error(StatusCode::GATEWAY_TIMEOUT, "timeout", e.to_string())
        }
        e @ DispatchError::JobFailed { .. } => {
            json_error(StatusCode::BAD_GATEWAY, "generation_failed", e.to_string())
        }
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
