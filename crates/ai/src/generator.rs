use async_trait::async_trait;
use thiserror::Error;

use crate::budget::GenerationOptions;
use crate::message::ChatMessage;

/// A text-generation backend.
///
/// Implementations must be cheap to share: the scheduler calls `generate` from
/// several workers at once through one `Arc<dyn Generator>`.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    /// Short name for logs (e.g. `"mistral"`).
    fn name(&self) -> &str;

    /// Run one completion over `messages` and return the reply text.
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String, GenerationError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Request(String),

    #[error("generation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("generation service rate limited the request")]
    RateLimited,

    #[error("generation service returned an empty reply")]
    EmptyReply,

    #[error("malformed generation reply: {0}")]
    InvalidResponse(String),

    #[error("generator not configured: {0}")]
    NotConfigured(String),
}

impl GenerationError {
    /// Map an HTTP status and body to an error.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            429 => Self::RateLimited,
            _ => Self::Status {
                status,
                body: body.into(),
            },
        }
    }
}
