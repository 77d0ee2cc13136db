use axum::{
    Router,
    routing::{get, post},
};

pub mod jobs;
pub mod system;
pub mod tone;

/// Router for the rewrite endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/api/tone", post(tone::rewrite))
        .route("/api/tone/versions", post(tone::versions))
        .route("/api/jobs/stats", get(jobs::stats))
}
