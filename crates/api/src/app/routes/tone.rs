use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use retone_core::Tone;
use retone_infra::{Coordinator, DispatchError};

use crate::app::{dto, errors};

pub async fn rewrite(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    body: Result<Json<dto::ToneRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.body_text()),
    };

    let request = match body.into_request() {
        Ok(request) => request,
        Err(e) => return errors::dispatch_error_to_response(DispatchError::Validation(e)),
    };

    match coordinator.dispatch(&request).await {
        Ok(outcome) => {
            debug!(
                key = %outcome.cache_key,
                from_cache = outcome.from_cache,
                total_attempts = outcome.total_attempts,
                "rewrite served"
            );
            Json(outcome).into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn versions(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    body: Result<Json<dto::VersionsRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", e.body_text()),
    };

    let tones = match Tone::parse_all(&body.tones) {
        Ok(tones) => tones,
        Err(e) => return errors::dispatch_error_to_response(DispatchError::Validation(e)),
    };

    match coordinator.versions(&body.text, &tones).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
