//! Supported rewrite tones.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A tone the rewriter can apply.
///
/// Serialized as its lowercase name, which is also what request keys and
/// prompt lookups use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Expanded,
    Casual,
    Concise,
    Center,
}

impl Tone {
    pub const ALL: [Tone; 5] = [
        Tone::Professional,
        Tone::Expanded,
        Tone::Casual,
        Tone::Concise,
        Tone::Center,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Expanded => "expanded",
            Tone::Casual => "casual",
            Tone::Concise => "concise",
            Tone::Center => "center",
        }
    }

    /// Parse a list of tone names, failing on the first unknown one.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Tone>, DomainError> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl core::fmt::Display for Tone {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "expanded" => Ok(Tone::Expanded),
            "casual" => Ok(Tone::Casual),
            "concise" => Ok(Tone::Concise),
            "center" => Ok(Tone::Center),
            _ => Err(DomainError::unknown_tone(s)),
        }
    }
}
