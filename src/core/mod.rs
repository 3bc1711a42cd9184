//! Core module - shared types, configuration, and error handling

pub mod config;
pub mod error;
pub mod types;

pub use config::{AgentConfig, Config, DimensionTables, ModelConfig};
pub use error::{Result, RubricError};
pub use types::{
    ArtifactKind, Dimension, FeatureContext, Message, ModuleDependency, OptimizationContext,
    ProjectContext, RunMode, Severity, Suggestion,
};
