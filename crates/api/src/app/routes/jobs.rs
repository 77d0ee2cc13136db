use std::sync::Arc;

use axum::{Json, extract::Extension};

use retone_infra::Coordinator;

use crate::app::dto;

/// Scheduler counters plus the most recent finished jobs.
pub async fn stats(Extension(coordinator): Extension<Arc<Coordinator>>) -> Json<dto::StatsResponse> {
    Json(dto::StatsResponse {
        scheduler: coordinator.stats(),
        recent: coordinator.recent_jobs(),
    })
}
