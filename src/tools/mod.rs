//! Tools module - catalog, parsing, rule checks, and execution

pub mod catalog;
pub mod checks;
pub mod executor;
pub mod parser;
pub mod thinking;

pub use catalog::{render_catalog, tool_catalog, ToolDefinition, ToolName};
pub use executor::{DeepChecker, DeepFinding, RetrievalService, RetrievedChunk, ToolExecutor, ToolResult};
pub use parser::{parse_thinking, parse_tool_call, ParseOutcome, ToolCall};
pub use thinking::{classify_thinking, Confidence, StructuredThinking, ThinkingStep, ThinkingStepKind};
