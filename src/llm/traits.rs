//! Completion client trait for abstracting the model backend
//!
//! The agent loop treats the model as an opaque text-completion service; the
//! tagged-block tool protocol lives entirely in this crate, so the client
//! only needs plain chat.

use async_trait::async_trait;

use crate::core::{Message, Result};

/// Options for a completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Temperature for sampling (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

/// Trait for text-completion backends
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate one assistant response for a system framing plus history.
    ///
    /// A transport or provider error is returned as-is; the caller decides
    /// whether it is fatal (the agent loop treats it as fatal).
    async fn complete(
        &self,
        system: &str,
        history: &[Message],
        options: Option<CompletionOptions>,
    ) -> Result<String>;

    /// Get the backend name for diagnostics
    fn name(&self) -> &str;
}
