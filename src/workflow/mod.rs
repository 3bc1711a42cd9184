//! Workflow module - session orchestration and prompt persistence

pub mod orchestrator;
pub mod store;

pub use orchestrator::{OptimizationRequest, Orchestrator};
pub use store::{FeatureRecord, InMemoryPromptStore, PromptStore};
