//! Sampling options and the output token budget.

use serde::{Deserialize, Serialize};

use retone_core::Tone;

/// Fixed sampling temperature for every rewrite.
pub const TEMPERATURE: f32 = 0.7;

/// Fixed nucleus-sampling value for every rewrite.
pub const TOP_P: f32 = 1.0;

/// Multiplier applied to the input estimate for `expanded` rewrites.
const EXPANDED_FACTOR: u32 = 3;

/// Options passed alongside the chat turns.
///
/// `None` means "let the service decide".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl GenerationOptions {
    /// Options for rewriting `text` under `tones`.
    pub fn for_rewrite(text: &str, tones: &[Tone]) -> Self {
        Self {
            max_tokens: token_budget(text, tones),
            temperature: Some(TEMPERATURE),
            top_p: Some(TOP_P),
        }
    }
}

/// Rough token count for `text` (about four characters per token).
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count() as u32;
    chars.div_ceil(4).max(1)
}

/// Output cap for a rewrite.
///
/// `concise` keeps the reply near the input length, `expanded` allows about
/// three times as much; any other combination is uncapped. `concise` wins when
/// both are present.
pub fn token_budget(text: &str, tones: &[Tone]) -> Option<u32> {
    let estimate = estimate_tokens(text);
    if tones.contains(&Tone::Concise) {
        Some(estimate)
    } else if tones.contains(&Tone::Expanded) {
        Some(estimate.saturating_mul(EXPANDED_FACTOR))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_rounds_up_and_never_hits_zero() {
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(""), 1);
    }

    #[test]
    fn concise_caps_near_input_length() {
        let text = "x".repeat(400);
        assert_eq!(token_budget(&text, &[Tone::Concise]), Some(100));
    }

    #[test]
    fn expanded_allows_three_times_the_input() {
        let text = "x".repeat(400);
        assert_eq!(token_budget(&text, &[Tone::Expanded, Tone::Casual]), Some(300));
    }

    #[test]
    fn concise_takes_precedence_over_expanded() {
        let text = "x".repeat(40);
        assert_eq!(token_budget(&text, &[Tone::Expanded, Tone::Concise]), Some(10));
    }

    #[test]
    fn other_tones_are_uncapped() {
        assert_eq!(token_budget("hello", &[Tone::Professional, Tone::Casual]), None);
    }

    #[test]
    fn rewrite_options_fix_sampling_parameters() {
        let opts = GenerationOptions::for_rewrite("hello", &[Tone::Center]);
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.top_p, Some(1.0));
        assert_eq!(opts.max_tokens, None);
    }
}
