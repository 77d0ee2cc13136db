//! Conversations handed to the generator.

use retone_core::Tone;

use crate::message::ChatMessage;
use crate::prompts;

/// Turns for a first rewrite of `text`.
pub fn fresh_conversation(text: &str, tones: &[Tone]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(prompts::system_prompt(tones)),
        ChatMessage::user(prompts::rewrite_instruction(text)),
    ]
}

/// Turns for a try-again rewrite that must diverge from `previous`.
pub fn retry_conversation(text: &str, tones: &[Tone], previous: &[String]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(prompts::try_again_prompt(tones, previous, text)),
        ChatMessage::user(prompts::rewrite_instruction(text)),
    ]
}
