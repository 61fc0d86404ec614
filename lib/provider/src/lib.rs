//! OpenAI-backed implementation of the flatmatch provider traits.

pub mod openai;
pub mod prompts;

pub use openai::{OpenAiClient, OpenAiConfig};
