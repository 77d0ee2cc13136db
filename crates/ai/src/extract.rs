//! Pull the rewrite out of a model reply.

use serde::Deserialize;

use crate::generator::GenerationError;

#[derive(Deserialize)]
struct JsonRewrite {
    rewritten_text: String,
}

/// Extract the rewritten text from `reply`.
///
/// Replies shaped like `{"rewritten_text": "..."}` (optionally inside a code
/// fence) yield the field; anything else is used as-is after trimming. A blank
/// result is an error so nothing empty reaches the cache.
pub fn extract_rewrite(reply: &str) -> Result<String, GenerationError> {
    let trimmed = strip_code_fence(reply.trim());

    let text = match serde_json::from_str::<JsonRewrite>(trimmed) {
        Ok(parsed) => parsed.rewritten_text.trim().to_string(),
        Err(_) => trimmed.to_string(),
    };

    if text.is_empty() {
        return Err(GenerationError::EmptyReply);
    }
    Ok(text)
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
