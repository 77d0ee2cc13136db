//! Dispatch requests, outcomes, and the validation rules for them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::key::RequestKey;
use crate::tone::Tone;

/// Longest accepted input text, in characters.
pub const MAX_TEXT_CHARS: usize = 1000;

/// Largest accepted tone combination.
pub const MAX_TONES: usize = 3;

/// A caller's request to rewrite `text` under `tones`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    pub text: String,
    pub tones: Vec<Tone>,
    /// Ask for a new version that differs from every stored one.
    #[serde(default)]
    pub try_again: bool,
}

impl RewriteRequest {
    pub fn new(text: impl Into<String>, tones: Vec<Tone>) -> Self {
        Self {
            text: text.into(),
            tones,
            try_again: false,
        }
    }

    pub fn try_again(mut self, try_again: bool) -> Self {
        self.try_again = try_again;
        self
    }

    /// Check the request against the accepted input shape.
    ///
    /// - text: 1..=1000 characters, not blank
    /// - tones: 1..=3, no repeats
    pub fn validate(&self) -> DomainResult<()> {
        if self.text.trim().is_empty() {
            return Err(DomainError::validation("text must not be empty"));
        }

        let chars = self.text.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Err(DomainError::validation(format!(
                "text must be at most {} characters (got {})",
                MAX_TEXT_CHARS, chars
            )));
        }

        if self.tones.is_empty() {
            return Err(DomainError::validation("at least one tone is required"));
        }

        if self.tones.len() > MAX_TONES {
            return Err(DomainError::validation(format!(
                "at most {} tones may be combined (got {})",
                MAX_TONES,
                self.tones.len()
            )));
        }

        let mut seen = HashSet::with_capacity(self.tones.len());
        for tone in &self.tones {
            if !seen.insert(tone) {
                return Err(DomainError::validation(format!("tone repeated: {}", tone)));
            }
        }

        Ok(())
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::derive(&self.text, &self.tones)
    }
}

/// What a dispatch returns to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteOutcome {
    pub result: String,
    pub attempt_number: usize,
    pub has_multiple_attempts: bool,
    pub total_attempts: usize,
    pub cache_key: RequestKey,
    pub from_cache: bool,
    /// A try-again request found no history and was served as a fresh rewrite.
    #[serde(default)]
    pub fresh_fallback: bool,
}

impl RewriteOutcome {
    /// Outcome of a first-time generation.
    pub fn fresh(result: String, cache_key: RequestKey) -> Self {
        Self {
            result,
            attempt_number: 1,
            has_multiple_attempts: false,
            total_attempts: 1,
            cache_key,
            from_cache: false,
            fresh_fallback: false,
        }
    }

    /// Outcome of a try-again generation; `total` is the new history length.
    pub fn retried(result: String, cache_key: RequestKey, total: usize) -> Self {
        Self {
            result,
            attempt_number: total,
            has_multiple_attempts: true,
            total_attempts: total,
            cache_key,
            from_cache: false,
            fresh_fallback: false,
        }
    }

    /// Outcome served straight from the cache.
    pub fn cached(result: String, cache_key: RequestKey, versions: usize) -> Self {
        Self {
            result,
            attempt_number: 1,
            has_multiple_attempts: versions > 1,
            total_attempts: versions,
            cache_key,
            from_cache: true,
            fresh_fallback: false,
        }
    }

    pub fn with_fresh_fallback(mut self, fallback: bool) -> Self {
        self.fresh_fallback = fallback;
        self
    }
}

/// All stored versions for one request key, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionsView {
    pub versions: Vec<String>,
    pub total: usize,
    pub cache_key: RequestKey,
    pub has_versions: bool,
}

impl VersionsView {
    pub fn new(cache_key: RequestKey, versions: Vec<String>) -> Self {
        Self {
            total: versions.len(),
            has_versions: !versions.is_empty(),
            versions,
            cache_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str, tones: Vec<Tone>) -> RewriteRequest {
        RewriteRequest::new(text, tones)
    }

    #[test]
    fn valid_request_passes() {
        assert!(request("Hello world", vec![Tone::Casual]).validate().is_ok());
        assert!(
            request("Hello", vec![Tone::Casual, Tone::Concise, Tone::Professional])
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn blank_text_is_rejected() {
        let err = request("   ", vec![Tone::Casual]).validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn text_limit_counts_characters_not_bytes() {
        let at_limit = "é".repeat(MAX_TEXT_CHARS);
        assert!(request(&at_limit, vec![Tone::Casual]).validate().is_ok());

        let over = "a".repeat(MAX_TEXT_CHARS + 1);
        assert!(request(&over, vec![Tone::Casual]).validate().is_err());
    }

    #[test]
    fn tone_count_is_bounded() {
        assert!(request("hi", vec![]).validate().is_err());

        let four = vec![Tone::Casual, Tone::Concise, Tone::Professional, Tone::Expanded];
        assert!(request("hi", four).validate().is_err());
    }

    #[test]
    fn repeated_tone_is_rejected() {
        let err = request("hi", vec![Tone::Casual, Tone::Casual])
            .validate()
            .unwrap_err();
        assert_eq!(err, DomainError::Validation("tone repeated: casual".to_string()));
    }

    #[test]
    fn outcome_serializes_in_camel_case() {
        let outcome = RewriteOutcome::cached(
            "Hey there".to_string(),
            RequestKey::derive("Hello", &[Tone::Casual]),
            2,
        );
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["fromCache"], true);
        assert_eq!(json["hasMultipleAttempts"], true);
        assert_eq!(json["totalAttempts"], 2);
        assert_eq!(json["attemptNumber"], 1);
        assert_eq!(json["cacheKey"], "Hello:casual");
    }

    #[test]
    fn cache_hit_reports_the_version_count_as_is() {
        let key = RequestKey::derive("Hello", &[Tone::Casual]);

        let lost_history = RewriteOutcome::cached("Hey".into(), key.clone(), 0);
        assert_eq!(lost_history.total_attempts, 0);
        assert_eq!(lost_history.attempt_number, 1);
        assert!(!lost_history.has_multiple_attempts);

        let two = RewriteOutcome::cached("Hey".into(), key, 2);
        assert_eq!(two.total_attempts, 2);
        assert!(two.has_multiple_attempts);
    }

    #[test]
    fn request_defaults_try_again_to_false() {
        let req: RewriteRequest =
            serde_json::from_str(r#"{"text":"hi","tones":["casual"]}"#).unwrap();
        assert!(!req.try_again);
    }

    #[test]
    fn versions_view_counts_entries() {
        let key = RequestKey::derive("hi", &[Tone::Casual]);
        let view = VersionsView::new(key.clone(), vec!["b".into(), "a".into()]);
        assert_eq!(view.total, 2);
        assert!(view.has_versions);

        let empty = VersionsView::new(key, vec![]);
        assert!(!empty.has_versions);
    }
}
