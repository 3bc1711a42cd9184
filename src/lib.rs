//! Rubric - Agentic Prompt Quality Analysis
//!
//! A tool-using agent that audits generated prompt artifacts (implementation
//! prompts and review prompts) against weighted quality dimensions, using a
//! local Ollama model for reasoning and a fixed tool catalog for evidence
//! gathering. Callers consume a live, strictly ordered event stream and can
//! pause, resume, or cancel sessions in flight.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Completion client abstraction with Ollama implementation
//! - **Tools**: Tool catalog, tagged-block parsing, rule checks, execution
//! - **Agent**: The reasoning loop, session state, and the event stream
//! - **Session**: Live session registry with pause/resume/cancel
//! - **Workflow**: Orchestration, prompt persistence, suggestion application
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_stream::StreamExt;
//! use rubric::{
//!     ArtifactKind, Config, InMemoryPromptStore, InMemorySessionStore, OllamaClient,
//!     OptimizationRequest, Orchestrator, RunMode,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load();
//!     let llm = Arc::new(OllamaClient::from_config(&config)?);
//!     let prompts = Arc::new(InMemoryPromptStore::new());
//!     let sessions = Arc::new(InMemorySessionStore::new());
//!     let orchestrator = Orchestrator::new(llm, prompts, sessions, config);
//!
//!     let mut events = orchestrator
//!         .start_optimization(OptimizationRequest {
//!             project_id: "p1".into(),
//!             feature_id: "f1".into(),
//!             kind: ArtifactKind::Implementation,
//!             mode: RunMode::Auto,
//!             dimensions: None,
//!         })
//!         .await;
//!     while let Some(event) = events.next().await {
//!         print!("{}", event.to_sse());
//!     }
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod core;
pub mod llm;
pub mod session;
pub mod tools;
pub mod workflow;

// Re-export commonly used items
pub use agent::{AgentEvent, AgentLoop, AgentState};
pub use core::{
    ArtifactKind, Config, Dimension, Message, OptimizationContext, Result, RubricError, RunMode,
    Severity, Suggestion,
};
pub use llm::{CompletionClient, CompletionOptions, OllamaClient};
pub use session::{InMemorySessionStore, SessionStatus, SessionStore, WaitOutcome};
pub use workflow::{InMemoryPromptStore, OptimizationRequest, Orchestrator, PromptStore};
