//! LLM module - model backend integrations
//!
//! Provides the completion abstraction with Ollama as the primary backend.

pub mod ollama;
pub mod traits;

pub use ollama::OllamaClient;
pub use traits::{CompletionClient, CompletionOptions};
