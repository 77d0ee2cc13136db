use serde::{Deserialize, Serialize};

use retone_core::{DomainError, RewriteRequest, Tone};
use retone_infra::RecentJobs;
use retone_infra::jobs::SchedulerStats;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /api/tone`. Tones arrive as names and are parsed here so an
/// unknown name is a validation error rather than a body rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneRequest {
    pub text: String,
    pub tones: Vec<String>,
    #[serde(default)]
    pub try_again: bool,
}

impl ToneRequest {
    pub fn into_request(self) -> Result<RewriteRequest, DomainError> {
        let tones = Tone::parse_all(&self.tones)?;
        Ok(RewriteRequest::new(self.text, tones).try_again(self.try_again))
    }
}

#[derive(Debug, Deserialize)]
pub struct VersionsRequest {
    pub text: String,
    pub tones: Vec<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub scheduler: SchedulerStats,
    pub recent: RecentJobs,
}
