//! Typed events emitted by the agent loop
//!
//! Events reach the caller as a live, strictly ordered stream. The transport
//! framing is server-sent events: `event: <type>\ndata: <json>\n\n`, one
//! blank line terminating each event.

use serde::Serialize;
use serde_json::Value;

use crate::core::{RunMode, Suggestion};
use crate::tools::thinking::StructuredThinking;

/// Aggregate counts attached to a ready plan
#[derive(Debug, Clone, Serialize)]
pub struct PlanAggregates {
    /// Suggestion counts keyed by severity ("high"/"medium"/"low")
    pub by_severity: Vec<(String, usize)>,
    /// Suggestion counts keyed by dimension id
    pub by_dimension: Vec<(String, usize)>,
}

/// One event in a session's stream
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Always first
    WorkflowStart {
        session_id: String,
        dimensions: Vec<String>,
        dimension_names: Vec<String>,
        mode: RunMode,
        artifact_length: usize,
    },
    /// Classified view of a free-text reasoning block
    Thinking {
        iteration: usize,
        text: String,
        structured: StructuredThinking,
        summary: String,
    },
    /// A tool is about to run
    Action {
        iteration: usize,
        tool: String,
        parameters: Value,
        justification: String,
    },
    /// The tool finished
    Observation {
        iteration: usize,
        tool: String,
        success: bool,
        summary: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Immediately follows the observation of the producing tool call
    Suggestion { suggestion: Suggestion },
    /// The loop is blocked pending a caller decision
    WorkflowPaused {
        session_id: String,
        reason: String,
        payload: Value,
    },
    /// The caller resumed a paused session
    WorkflowResumed { session_id: String },
    /// Plan mode: the full suggestion set awaits confirmation
    PlanReady {
        session_id: String,
        suggestions: Vec<Suggestion>,
        aggregates: PlanAggregates,
        observations: Vec<String>,
        summary: String,
        quality: String,
    },
    /// Terminal event on the normal path
    WorkflowComplete {
        session_id: String,
        total_iterations: usize,
        total_suggestions: usize,
        total_observations: usize,
        summary: String,
        quality: String,
    },
    /// Terminal event on hard-stop paths; recoverable errors never surface here
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        iteration: Option<usize>,
    },
}

impl AgentEvent {
    /// Wire name of this event
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::WorkflowStart { .. } => "workflow_start",
            Self::Thinking { .. } => "thinking",
            Self::Action { .. } => "action",
            Self::Observation { .. } => "observation",
            Self::Suggestion { .. } => "suggestion",
            Self::WorkflowPaused { .. } => "workflow_paused",
            Self::WorkflowResumed { .. } => "workflow_resumed",
            Self::PlanReady { .. } => "plan_ready",
            Self::WorkflowComplete { .. } => "workflow_complete",
            Self::Error { .. } => "error",
        }
    }

    /// Data payload without the event tag
    pub fn payload(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Value::Object(ref mut map) = value {
            map.remove("event");
        }
        value
    }

    /// Render the SSE frame for this event
    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event_type(), self.payload())
    }
}
