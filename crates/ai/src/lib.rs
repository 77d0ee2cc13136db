//! `retone-ai`
//!
//! **Responsibility:** the contract with the text-generation collaborator.
//!
//! This crate knows how to *ask* for a rewrite, not how to schedule one:
//! - chat turns and sampling options (`message`, `budget`)
//! - the `Generator` trait implemented by HTTP clients and test doubles
//! - prompt wording for fresh and try-again rewrites (`prompts`, `conversation`)
//! - pulling the rewritten text back out of a model reply (`extract`)

pub mod budget;
pub mod conversation;
pub mod extract;
pub mod generator;
pub mod message;
pub mod prompts;

pub use budget::{GenerationOptions, estimate_tokens, token_budget};
pub use conversation::{fresh_conversation, retry_conversation};
pub use extract::extract_rewrite;
pub use generator::{GenerationError, Generator};
pub use message::{ChatMessage, ChatRole};
