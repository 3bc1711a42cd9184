//! Per-session agent state
//!
//! One [`AgentState`] is owned by exactly one loop invocation and threaded by
//! exclusive reference through the tool executor. Nothing outside that task
//! ever touches it, so no locking is involved. Cache entries are never
//! invalidated within a session: the artifact text is immutable for the
//! session's lifetime.

use std::collections::HashMap;

use serde_json::Value;

use crate::core::{ArtifactKind, OptimizationContext, Suggestion};

/// The single mutable object threaded through one session
#[derive(Debug)]
pub struct AgentState {
    /// The artifact text under analysis
    pub artifact: String,
    /// Which artifact kind this session analyzes
    pub kind: ArtifactKind,
    /// Immutable context bundle built at session start
    pub context: OptimizationContext,
    /// Transitions false -> true exactly once, via the complete_workflow tool
    pub is_complete: bool,
    /// Appended by generate_suggestion only; entries are never mutated
    pub suggestions: Vec<Suggestion>,
    /// Appended by record_observation only
    pub observations: Vec<String>,
    /// Closing summary, set on completion
    pub summary: String,
    /// Quality verdict, set on completion
    pub quality: String,
    /// Retrieval results keyed by normalized query
    pub retrieval_cache: HashMap<String, Value>,
    /// Feature context keyed by feature name ("self" for the analyzed one)
    pub feature_cache: HashMap<String, Value>,
    /// Dependency lookup result; there is only one per session
    pub dependency_cache: Option<Value>,
    /// Rule-check results keyed by check name
    pub check_cache: HashMap<String, Value>,
    suggestion_seq: usize,
}

impl AgentState {
    /// Create the state for a fresh session
    pub fn new(artifact: String, kind: ArtifactKind, context: OptimizationContext) -> Self {
        Self {
            artifact,
            kind,
            context,
            is_complete: false,
            suggestions: Vec::new(),
            observations: Vec::new(),
            summary: String::new(),
            quality: String::new(),
            retrieval_cache: HashMap::new(),
            feature_cache: HashMap::new(),
            dependency_cache: None,
            check_cache: HashMap::new(),
            suggestion_seq: 0,
        }
    }

    /// Next session-unique suggestion id
    pub fn next_suggestion_id(&mut self) -> String {
        self.suggestion_seq += 1;
        format!("s-{:03}", self.suggestion_seq)
    }
}
