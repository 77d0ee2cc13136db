//! Content-addressed request keys.
//!
//! A key identifies a (text, tone set) pair. The tone set is order-insensitive:
//! `[casual, concise]` and `[concise, casual]` address the same cache entry and
//! the same version history.

use serde::{Deserialize, Serialize};

use crate::tone::Tone;

const TEXT_SEPARATOR: char = ':';
const TONE_DELIMITER: &str = "-";

/// Canonical identifier of a rewrite request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestKey(String);

impl RequestKey {
    /// Derive the key for `text` under `tones`.
    ///
    /// The tones are copied and sorted by name; the caller's slice is untouched.
    /// Surrounding whitespace in `text` does not change the key.
    pub fn derive(text: &str, tones: &[Tone]) -> Self {
        let mut names: Vec<&'static str> = tones.iter().map(Tone::as_str).collect();
        names.sort_unstable();

        let tone_key = names.join(TONE_DELIMITER);
        Self(format!("{}{}{}", text.trim(), TEXT_SEPARATOR, tone_key))
    }

    /// Wrap an already-derived key (e.g. read back from a job record).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
