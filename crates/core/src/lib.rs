//! `retone-core`: request vocabulary shared by every layer.
//!
//! Pure types only: tones, request keys, dispatch requests/outcomes and the
//! validation rules that guard them. No I/O lives here.

pub mod error;
pub mod id;
pub mod key;
pub mod request;
pub mod tone;

pub use error::{DomainError, DomainResult};
pub use id::JobId;
pub use key::RequestKey;
pub use request::{MAX_TEXT_CHARS, MAX_TONES, RewriteOutcome, RewriteRequest, VersionsView};
pub use tone::Tone;
