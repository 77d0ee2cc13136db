//! Prompt wording for rewrites.
//!
//! Tone combinations are looked up by their sorted, dash-joined names (the same
//! order request keys use). Unknown combinations fall back to the `center`
//! description.

use retone_core::Tone;

const PROFESSIONAL: &str = "Formal and authoritative. Polished, respectful language suited to \
    business correspondence and documentation.";
const EXPANDED: &str = "Detailed and informative. Adds context, explanation and supporting \
    examples so the content reads as complete.";
const CASUAL: &str = "Relaxed and conversational. Warm, approachable wording that reads like \
    a chat with a peer.";
const CONCISE: &str = "Brief and direct. Keeps only the essential information and drops \
    redundancy.";
const CENTER: &str = "Balanced and neutral. Clear and readable, neither stiff nor chatty.";

const EXPANDED_PROFESSIONAL: &str = "Detailed and formal. Thorough explanation and context in \
    a polished, authoritative register.";
const CONCISE_PROFESSIONAL: &str = "Brief and formal. Essential information stated precisely \
    in professional language.";
const CASUAL_EXPANDED: &str = "Friendly and detailed. Approachable wording with extra context \
    and examples.";
const CASUAL_CONCISE: &str = "Friendly and brief. Warm wording that gets to the key points \
    quickly.";

/// Sorted, dash-joined tone names (`"casual-concise"`).
pub fn tone_combination(tones: &[Tone]) -> String {
    let mut names: Vec<&str> = tones.iter().map(Tone::as_str).collect();
    names.sort_unstable();
    names.join("-")
}

/// Human-readable tone list for instructions (`"casual and concise"`).
pub fn tone_list(tones: &[Tone]) -> String {
    tones
        .iter()
        .map(Tone::as_str)
        .collect::<Vec<_>>()
        .join(" and ")
}

/// Description of the requested tone combination.
pub fn tone_description(tones: &[Tone]) -> &'static str {
    match tone_combination(tones).as_str() {
        "professional" => PROFESSIONAL,
        "expanded" => EXPANDED,
        "casual" => CASUAL,
        "concise" => CONCISE,
        "center" => CENTER,
        "expanded-professional" => EXPANDED_PROFESSIONAL,
        "concise-professional" => CONCISE_PROFESSIONAL,
        "casual-expanded" => CASUAL_EXPANDED,
        "casual-concise" => CASUAL_CONCISE,
        _ => CENTER,
    }
}

/// System turn for a first rewrite.
pub fn system_prompt(tones: &[Tone]) -> String {
    format!(
        "You rewrite text. Apply this tone:\n\n{}\n\n\
         Rules:\n\
         - Reply ONLY with JSON of the form {{\"rewritten_text\": \"...\"}}.\n\
         - Put the rewrite in \"rewritten_text\" and add no other keys.\n\
         - No greetings, explanations or commentary.\n\
         - Keep the original meaning.\n\
         - Plain text inside the JSON, no markdown.",
        tone_description(tones)
    )
}

/// User turn for a first rewrite.
pub fn rewrite_instruction(text: &str) -> String {
    format!("Please rewrite the following text: {}", text)
}

/// System turn for a try-again rewrite.
///
/// Lists every earlier version and asks for something different from all of
/// them in vocabulary, sentence structure and length.
pub fn try_again_prompt(tones: &[Tone], previous: &[String], original: &str) -> String {
    let numbered = previous
        .iter()
        .enumerate()
        .map(|(i, attempt)| format!("{}. \"{}\"", i + 1, attempt))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You have already rewritten this text. Write a COMPLETELY DIFFERENT version that \
         repeats none of the earlier wording or sentence structures.\n\n\
         Earlier versions:\n{numbered}\n\n\
         For this version:\n\
         - choose different vocabulary than every earlier version\n\
         - use different sentence structures and lengths\n\
         - if earlier versions were long, try shorter, and the other way round\n\
         - approach the {tones} tone from a fresh angle ({description})\n\
         - keep the core meaning of the original\n\n\
         Original text: \"{original}\"\n\n\
         Return ONLY the rewritten text, with no introduction or commentary.",
        tones = tone_list(tones),
        description = tone_description(tones),
    )
}
