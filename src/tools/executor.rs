//! Tool executor - runs parsed tool calls against session state
//!
//! Dispatch is an exhaustive match over [`ToolName`]; unknown names never get
//! here because the parser rejects them. Handler failures are converted into
//! failed [`ToolResult`]s and reported through the normal observation path;
//! they never abort the session.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::agent::state::AgentState;
use crate::core::{Dimension, OptimizationContext, Result, Severity, Suggestion};
use crate::tools::catalog::ToolName;
use crate::tools::checks;
use crate::tools::parser::ToolCall;

/// Content fields returned by retrieval are capped at this many characters
const RETRIEVAL_CONTENT_CAP: usize = 500;
/// Default number of passages returned by rag_retrieve
const DEFAULT_TOP_K: usize = 3;

/// Uniform result envelope for every tool call
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    /// Arbitrary result data fed back to the model and into events
    pub data: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Short human-readable line folded into the next model turn
    pub summary: String,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(summary: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            success: true,
            data,
            error: None,
            summary: summary.into(),
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            data: Map::new(),
            error: Some(error.clone()),
            summary: error,
        }
    }
}

/// One passage returned by the retrieval collaborator
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub source: String,
    pub content: String,
    pub score: f32,
}

/// Opaque vector-similarity search collaborator
#[async_trait]
pub trait RetrievalService: Send + Sync {
    /// Search project documents for passages relevant to the query
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>>;
}

/// One finding from the delegated deep check
#[derive(Debug, Clone, Serialize)]
pub struct DeepFinding {
    pub dimension: String,
    pub severity: Severity,
    pub finding: String,
}

/// Opaque collaborator that issues its own structured model call
#[async_trait]
pub trait DeepChecker: Send + Sync {
    /// Check the artifact across the given dimensions
    async fn check(
        &self,
        artifact: &str,
        context: &OptimizationContext,
        dimensions: &[Dimension],
    ) -> Result<Vec<DeepFinding>>;
}

/// Executes tool calls for one session
pub struct ToolExecutor {
    retrieval: Option<Arc<dyn RetrievalService>>,
    deep_checker: Option<Arc<dyn DeepChecker>>,
    /// Dimensions active for this session, source of suggestion weights
    dimensions: Vec<Dimension>,
}

impl ToolExecutor {
    /// Create an executor with no optional collaborators
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        Self {
            retrieval: None,
            deep_checker: None,
            dimensions,
        }
    }

    /// Attach a retrieval collaborator
    pub fn with_retrieval(mut self, retrieval: Arc<dyn RetrievalService>) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    /// Attach a deep-check collaborator
    pub fn with_deep_checker(mut self, deep_checker: Arc<dyn DeepChecker>) -> Self {
        self.deep_checker = Some(deep_checker);
        self
    }

    /// Execute one tool call against the session state.
    ///
    /// Always returns a [`ToolResult`]; internal failures are folded into a
    /// failed envelope rather than propagated.
    pub async fn execute(&self, call: &ToolCall, state: &mut AgentState) -> ToolResult {
        match call.name {
            ToolName::RagRetrieve => self.rag_retrieve(call, state).await,
            ToolName::GetFeatureContext => Self::get_feature_context(call, state),
            ToolName::GetDependencies => Self::get_dependencies(state),
            ToolName::CheckCompleteness => Self::run_check(ToolName::CheckCompleteness, state),
            ToolName::CheckInterface => Self::run_check(ToolName::CheckInterface, state),
            ToolName::CheckDependency => Self::run_check(ToolName::CheckDependency, state),
            ToolName::DeepCheck => self.deep_check(call, state).await,
            ToolName::GenerateSuggestion => self.generate_suggestion(call, state),
            ToolName::RecordObservation => Self::record_observation(call, state),
            ToolName::CompleteWorkflow => Self::complete_workflow(call, state),
        }
    }

    /// Normalized cache signature for a retrieval query
    fn normalize_query(query: &str) -> String {
        query
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn rag_retrieve(&self, call: &ToolCall, state: &mut AgentState) -> ToolResult {
        let Some(query) = call.get_str("query") else {
            return ToolResult::fail("rag_retrieve requires a non-empty 'query'");
        };
        let key = Self::normalize_query(&query);

        if let Some(cached) = state.retrieval_cache.get(&key) {
            let mut data = Map::new();
            data.insert("query".to_string(), json!(query));
            data.insert("results".to_string(), cached.clone());
            return ToolResult::ok(
                format!("retrieved passages for '{}' (from cache)", query),
                data,
            );
        }

        let Some(retrieval) = &self.retrieval else {
            return ToolResult::fail(
                "retrieval is unavailable: no vector index is configured for this project",
            );
        };

        let top_k = call.get_usize("top_k").unwrap_or(DEFAULT_TOP_K);
        let chunks = match retrieval.search(&query, top_k).await {
            Ok(chunks) => chunks,
            Err(e) => return ToolResult::fail(format!("retrieval failed: {}", e)),
        };

        let results: Vec<Value> = chunks
            .into_iter()
            .map(|c| {
                json!({
                    "source": c.source,
                    "content": truncate_chars(&c.content, RETRIEVAL_CONTENT_CAP),
                    "score": c.score,
                })
            })
            .collect();
        let count = results.len();
        let results = Value::Array(results);
        state.retrieval_cache.insert(key, results.clone());

        let mut data = Map::new();
        data.insert("query".to_string(), json!(query));
        data.insert("results".to_string(), results);
        ToolResult::ok(
            format!("retrieved {} passage(s) for '{}'", count, query),
            data,
        )
    }

    fn get_feature_context(call: &ToolCall, state: &mut AgentState) -> ToolResult {
        let requested = call.get_str("feature_name");
        let key = requested.clone().unwrap_or_else(|| "self".to_string());

        if let Some(cached) = state.feature_cache.get(&key) {
            let mut data = Map::new();
            data.insert("feature".to_string(), cached.clone());
            return ToolResult::ok(format!("feature context for '{}' (from cache)", key), data);
        }

        let feature = match &requested {
            None => Some(&state.context.feature),
            Some(name) => {
                let lower = name.to_lowercase();
                if state.context.feature.name.to_lowercase() == lower {
                    Some(&state.context.feature)
                } else {
                    state
                        .context
                        .siblings
                        .iter()
                        .find(|s| s.name.to_lowercase() == lower)
                }
            }
        };

        let Some(feature) = feature else {
            let known: Vec<&str> = state
                .context
                .siblings
                .iter()
                .map(|s| s.name.as_str())
                .collect();
            return ToolResult::fail(format!(
                "unknown feature '{}'; known siblings: {}",
                requested.unwrap_or_default(),
                known.join(", ")
            ));
        };

        let value = match serde_json::to_value(feature) {
            Ok(v) => v,
            Err(e) => return ToolResult::fail(format!("failed to encode feature context: {}", e)),
        };
        state.feature_cache.insert(key.clone(), value.clone());

        let mut data = Map::new();
        data.insert("feature".to_string(), value);
        ToolResult::ok(format!("feature context for '{}'", key), data)
    }

    fn get_dependencies(state: &mut AgentState) -> ToolResult {
        if let Some(cached) = &state.dependency_cache {
            let mut data = Map::new();
            data.insert("dependencies".to_string(), cached.clone());
            return ToolResult::ok("module dependencies (from cache)", data);
        }

        let module = &state.context.feature.module;
        let edges: Vec<Value> = state
            .context
            .project
            .module_dependencies
            .iter()
            .filter(|d| &d.from == module || &d.to == module)
            .map(|d| {
                json!({
                    "from": d.from,
                    "to": d.to,
                    "description": d.description,
                })
            })
            .collect();
        let count = edges.len();
        let value = Value::Array(edges);
        state.dependency_cache = Some(value.clone());

        let mut data = Map::new();
        data.insert("dependencies".to_string(), value);
        ToolResult::ok(
            format!("{} dependency edge(s) touch module '{}'", count, module),
            data,
        )
    }

    fn run_check(name: ToolName, state: &mut AgentState) -> ToolResult {
        let key = name.as_str().to_string();
        if let Some(cached) = state.check_cache.get(&key) {
            let mut data = Map::new();
            data.insert("report".to_string(), cached.clone());
            return ToolResult::ok(format!("{} (from cache)", key), data);
        }

        let report = match name {
            ToolName::CheckCompleteness => {
                checks::check_completeness(&state.artifact, &state.context.feature)
            }
            ToolName::CheckInterface => {
                checks::check_interface(&state.artifact, &state.context.feature)
            }
            ToolName::CheckDependency => checks::check_dependency(
                &state.artifact,
                &state.context.feature,
                &state.context.project,
            ),
            // run_check is only called with the three check tools
            _ => return ToolResult::fail(format!("'{}' is not a rule-based check", name)),
        };

        let verdict = if report.passed { "passed" } else { "failed" };
        let summary = format!("{} {} with {} issue(s)", key, verdict, report.issues.len());
        let value = match serde_json::to_value(&report) {
            Ok(v) => v,
            Err(e) => return ToolResult::fail(format!("failed to encode check report: {}", e)),
        };
        state.check_cache.insert(key, value.clone());

        let mut data = Map::new();
        data.insert("report".to_string(), value);
        ToolResult::ok(summary, data)
    }

    async fn deep_check(&self, call: &ToolCall, state: &mut AgentState) -> ToolResult {
        let requested: Vec<Dimension> = match call.get_str("dimensions") {
            Some(list) => {
                let ids: Vec<&str> = list.split(',').map(str::trim).collect();
                self.dimensions
                    .iter()
                    .filter(|d| ids.contains(&d.id.as_str()))
                    .cloned()
                    .collect()
            }
            None => self.dimensions.clone(),
        };

        let Some(deep_checker) = &self.deep_checker else {
            // Degrade gracefully: report each dimension as skipped instead of
            // failing the call.
            let skipped: Vec<Value> = requested
                .iter()
                .map(|d| {
                    json!({
                        "dimension": d.id,
                        "status": "skipped",
                        "note": "no deep checker configured; rule-based checks used instead",
                    })
                })
                .collect();
            let mut data = Map::new();
            data.insert("skipped".to_string(), json!(true));
            data.insert("findings".to_string(), Value::Array(skipped));
            return ToolResult::ok(
                "deep check skipped; rule-based checks used instead",
                data,
            );
        };

        let findings = match deep_checker
            .check(&state.artifact, &state.context, &requested)
            .await
        {
            Ok(findings) => findings,
            Err(e) => return ToolResult::fail(format!("deep check failed: {}", e)),
        };

        let count = findings.len();
        let value = match serde_json::to_value(&findings) {
            Ok(v) => v,
            Err(e) => return ToolResult::fail(format!("failed to encode findings: {}", e)),
        };
        let mut data = Map::new();
        data.insert("skipped".to_string(), json!(false));
        data.insert("findings".to_string(), value);
        ToolResult::ok(
            format!(
                "deep check produced {} finding(s) across {} dimension(s)",
                count,
                requested.len()
            ),
            data,
        )
    }

    fn generate_suggestion(&self, call: &ToolCall, state: &mut AgentState) -> ToolResult {
        let Some(dimension) = call.get_str("dimension") else {
            return ToolResult::fail("generate_suggestion requires a non-empty 'dimension'");
        };
        let Some(severity_raw) = call.get_str("severity") else {
            return ToolResult::fail("generate_suggestion requires a non-empty 'severity'");
        };
        let Some(problem) = call.get_str("problem") else {
            return ToolResult::fail("generate_suggestion requires a non-empty 'problem'");
        };
        let Some(justification) = call.get_str("justification") else {
            return ToolResult::fail("generate_suggestion requires a non-empty 'justification'");
        };
        let severity: Severity = match severity_raw.parse() {
            Ok(s) => s,
            Err(e) => return ToolResult::fail(e),
        };

        let weight = self
            .dimensions
            .iter()
            .find(|d| d.id == dimension)
            .map(|d| d.weight)
            .unwrap_or(0.5);

        let id = state.next_suggestion_id();
        let suggestion = Suggestion {
            id: id.clone(),
            dimension: dimension.clone(),
            severity,
            problem,
            original_text: call.get_str("original_text"),
            suggested_text: call.get_str("suggested_text"),
            justification,
            weight,
        };
        state.suggestions.push(suggestion);

        let mut data = Map::new();
        data.insert("suggestion_id".to_string(), json!(id));
        ToolResult::ok(
            format!("recorded suggestion {} ({}, {})", id, severity, dimension),
            data,
        )
    }

    fn record_observation(call: &ToolCall, state: &mut AgentState) -> ToolResult {
        let Some(content) = call.get_str("content") else {
            return ToolResult::fail("record_observation requires a non-empty 'content'");
        };
        state.observations.push(content);
        let index = state.observations.len();

        let mut data = Map::new();
        data.insert("observation_index".to_string(), json!(index));
        ToolResult::ok(format!("recorded observation #{}", index), data)
    }

    fn complete_workflow(call: &ToolCall, state: &mut AgentState) -> ToolResult {
        let Some(summary) = call.get_str("summary") else {
            return ToolResult::fail("complete_workflow requires a non-empty 'summary'");
        };
        let Some(quality) = call.get_str("quality") else {
            return ToolResult::fail("complete_workflow requires a non-empty 'quality'");
        };

        state.is_complete = true;
        state.summary = summary;
        state.quality = quality.clone();

        let mut data = Map::new();
        data.insert("quality".to_string(), json!(quality));
        ToolResult::ok(format!("analysis complete: quality={}", quality), data)
    }
}

/// Truncate on a character boundary
fn truncate_chars(s: &str, cap: usize) -> String {
    if s.chars().count() <= cap {
        s.to_string()
    } else {
        s.chars().take(cap).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ArtifactKind, FeatureContext, ProjectContext, RubricError};
    use crate::tools::parser::{parse_tool_call, ParseOutcome};

    fn context() -> OptimizationContext {
        OptimizationContext::new(
            ProjectContext {
                id: "p1".into(),
                name: "demo".into(),
                architecture: "layered".into(),
                tech_stack: vec!["rust".into()],
                module_dependencies: vec![crate::core::ModuleDependency {
                    from: "api".into(),
                    to: "storage".into(),
                    description: None,
                }],
            },
            FeatureContext {
                id: "f1".into(),
                name: "login".into(),
                description: "User login".into(),
                inputs: vec!["username".into()],
                outputs: vec!["token".into()],
                system: "auth".into(),
                module: "api".into(),
            },
            vec![FeatureContext {
                id: "f2".into(),
                name: "logout".into(),
                description: "User logout".into(),
                inputs: vec![],
                outputs: vec![],
                system: "auth".into(),
                module: "api".into(),
            }],
        )
    }

    fn state() -> AgentState {
        AgentState::new(
            "Login accepts a username and returns a token.".into(),
            ArtifactKind::Implementation,
            context(),
        )
    }

    fn dimensions() -> Vec<Dimension> {
        vec![
            Dimension::new("completeness", "Completeness", 0.9),
            Dimension::new("interface_clarity", "Interface Clarity", 0.8),
        ]
    }

    fn call(json_text: &str) -> ToolCall {
        match parse_tool_call(&format!("<tool_call>{}</tool_call>", json_text)) {
            ParseOutcome::Parsed(call) => call,
            other => panic!("expected parsed call, got {:?}", other),
        }
    }

    struct FixedRetrieval;

    #[async_trait]
    impl RetrievalService for FixedRetrieval {
        async fn search(&self, query: &str, _top_k: usize) -> Result<Vec<RetrievedChunk>> {
            Ok(vec![RetrievedChunk {
                source: "doc.md".into(),
                content: format!("about {}: {}", query, "x".repeat(600)),
                score: 0.9,
            }])
        }
    }

    struct FailingRetrieval;

    #[async_trait]
    impl RetrievalService for FailingRetrieval {
        async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<RetrievedChunk>> {
            Err(RubricError::retrieval("index offline"))
        }
    }

    #[tokio::test]
    async fn test_retrieval_cache_idempotent() {
        let executor = ToolExecutor::new(dimensions()).with_retrieval(Arc::new(FixedRetrieval));
        let mut state = state();
        let c = call(r#"{"tool":"rag_retrieve","parameters":{"query":"Auth  Flow"},"reasoning":""}"#);

        let first = executor.execute(&c, &mut state).await;
        assert!(first.success);
        assert!(!first.summary.contains("cache"));

        // Same query modulo whitespace/case normalizes to the same key.
        let c2 = call(r#"{"tool":"rag_retrieve","parameters":{"query":"auth flow"},"reasoning":""}"#);
        let second = executor.execute(&c2, &mut state).await;
        assert!(second.success);
        assert!(second.summary.contains("from cache"));
        assert_eq!(first.data.get("results"), second.data.get("results"));
    }

    #[tokio::test]
    async fn test_retrieval_content_capped() {
        let executor = ToolExecutor::new(dimensions()).with_retrieval(Arc::new(FixedRetrieval));
        let mut state = state();
        let c = call(r#"{"tool":"rag_retrieve","parameters":{"query":"auth"},"reasoning":""}"#);
        let result = executor.execute(&c, &mut state).await;
        let content = result.data["results"][0]["content"].as_str().unwrap();
        assert_eq!(content.chars().count(), RETRIEVAL_CONTENT_CAP);
    }

    #[tokio::test]
    async fn test_retrieval_unavailable_fails_gracefully() {
        let executor = ToolExecutor::new(dimensions());
        let mut state = state();
        let c = call(r#"{"tool":"rag_retrieve","parameters":{"query":"auth"},"reasoning":""}"#);
        let result = executor.execute(&c, &mut state).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("no vector index"));
    }

    #[tokio::test]
    async fn test_retrieval_error_becomes_failed_result() {
        let executor = ToolExecutor::new(dimensions()).with_retrieval(Arc::new(FailingRetrieval));
        let mut state = state();
        let c = call(r#"{"tool":"rag_retrieve","parameters":{"query":"auth"},"reasoning":""}"#);
        let result = executor.execute(&c, &mut state).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("index offline"));
    }

    #[tokio::test]
    async fn test_feature_context_self_and_sibling() {
        let executor = ToolExecutor::new(dimensions());
        let mut state = state();

        let c = call(r#"{"tool":"get_feature_context","parameters":{},"reasoning":""}"#);
        let result = executor.execute(&c, &mut state).await;
        assert!(result.success);
        assert_eq!(result.data["feature"]["name"], "login");

        let c = call(
            r#"{"tool":"get_feature_context","parameters":{"feature_name":"logout"},"reasoning":""}"#,
        );
        let result = executor.execute(&c, &mut state).await;
        assert!(result.success);
        assert_eq!(result.data["feature"]["name"], "logout");

        let c = call(
            r#"{"tool":"get_feature_context","parameters":{"feature_name":"billing"},"reasoning":""}"#,
        );
        let result = executor.execute(&c, &mut state).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_check_runs_once_per_session() {
        let executor = ToolExecutor::new(dimensions());
        let mut state = state();
        let c = call(r#"{"tool":"check_completeness","parameters":{},"reasoning":""}"#);

        let first = executor.execute(&c, &mut state).await;
        let second = executor.execute(&c, &mut state).await;
        assert!(second.summary.contains("from cache"));
        assert_eq!(first.data.get("report"), second.data.get("report"));
    }

    #[tokio::test]
    async fn test_deep_check_degrades_without_checker() {
        let executor = ToolExecutor::new(dimensions());
        let mut state = state();
        let c = call(r#"{"tool":"deep_check","parameters":{},"reasoning":""}"#);
        let result = executor.execute(&c, &mut state).await;
        assert!(result.success);
        assert_eq!(result.data["skipped"], json!(true));
        assert_eq!(result.data["findings"].as_array().unwrap().len(), 2);
        assert!(result.summary.contains("skipped"));
    }

    #[tokio::test]
    async fn test_generate_suggestion_round_trip() {
        let executor = ToolExecutor::new(dimensions());
        let mut state = state();
        let c = call(
            r#"{"tool":"generate_suggestion","parameters":{"dimension":"completeness","severity":"high","problem":"no error path","justification":"callers need it","suggested_text":"Describe the error path."},"reasoning":""}"#,
        );
        let result = executor.execute(&c, &mut state).await;
        assert!(result.success);
        assert_eq!(state.suggestions.len(), 1);
        let s = &state.suggestions[0];
        assert_eq!(result.data["suggestion_id"], json!(s.id));
        assert_eq!(s.severity, Severity::High);
        assert!((s.weight - 0.9).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_generate_suggestion_rejects_bad_severity() {
        let executor = ToolExecutor::new(dimensions());
        let mut state = state();
        let c = call(
            r#"{"tool":"generate_suggestion","parameters":{"dimension":"completeness","severity":"catastrophic","problem":"x","justification":"y"},"reasoning":""}"#,
        );
        let result = executor.execute(&c, &mut state).await;
        assert!(!result.success);
        assert!(state.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_complete_workflow_sets_state() {
        let executor = ToolExecutor::new(dimensions());
        let mut state = state();
        let c = call(
            r#"{"tool":"complete_workflow","parameters":{"summary":"solid prompt","quality":"good"},"reasoning":""}"#,
        );
        let result = executor.execute(&c, &mut state).await;
        assert!(result.success);
        assert!(state.is_complete);
        assert_eq!(state.summary, "solid prompt");
        assert_eq!(state.quality, "good");
    }

    #[tokio::test]
    async fn test_record_observation() {
        let executor = ToolExecutor::new(dimensions());
        let mut state = state();
        let c = call(
            r#"{"tool":"record_observation","parameters":{"content":"inputs read well"},"reasoning":""}"#,
        );
        let result = executor.execute(&c, &mut state).await;
        assert!(result.success);
        assert_eq!(state.observations, vec!["inputs read well".to_string()]);
    }
}
