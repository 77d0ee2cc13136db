//! External service clients.

pub mod mistral;

pub use mistral::MistralGenerator;
