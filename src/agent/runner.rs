//! Agent reasoning loop
//!
//! Drives the Thought -> Action -> Observation cycle for one session: calls
//! the model, parses its tagged response, executes the resulting tool, folds
//! the observation back into history, and emits the typed event sequence.
//! Iteration and retry bounds guarantee termination; the mode-dependent
//! suspend points block on the session store's wait primitive.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::agent::events::{AgentEvent, PlanAggregates};
use crate::agent::state::AgentState;
use crate::core::{AgentConfig, ArtifactKind, Dimension, Message, RunMode, Suggestion};
use crate::llm::{CompletionClient, CompletionOptions};
use crate::session::{SessionStore, WaitOutcome};
use crate::tools::catalog::{render_catalog, ToolName};
use crate::tools::executor::{ToolExecutor, ToolResult};
use crate::tools::parser::{parse_thinking, parse_tool_call, ParseOutcome, ToolCall};
use crate::tools::thinking::classify_thinking;

/// Runs the reasoning loop for one session
pub struct AgentLoop {
    llm: Arc<dyn CompletionClient>,
    executor: ToolExecutor,
    sessions: Arc<dyn SessionStore>,
    session_id: String,
    mode: RunMode,
    config: AgentConfig,
}

impl AgentLoop {
    /// Create a loop bound to one registered session
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        executor: ToolExecutor,
        sessions: Arc<dyn SessionStore>,
        session_id: impl Into<String>,
        mode: RunMode,
        config: AgentConfig,
    ) -> Self {
        Self {
            llm,
            executor,
            sessions,
            session_id: session_id.into(),
            mode,
            config,
        }
    }

    /// Run the session to its terminal event.
    ///
    /// Exactly one of `workflow_complete` (normal paths, including the
    /// iteration cap) or `error` (model transport failure, suspend timeout,
    /// cancellation) ends the stream.
    pub async fn run(
        self,
        mut state: AgentState,
        dimensions: Vec<Dimension>,
        tx: mpsc::Sender<AgentEvent>,
    ) {
        let emit = |event: AgentEvent| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event).await;
            }
        };

        emit(AgentEvent::WorkflowStart {
            session_id: self.session_id.clone(),
            dimensions: dimensions.iter().map(|d| d.id.clone()).collect(),
            dimension_names: dimensions.iter().map(|d| d.display_name.clone()).collect(),
            mode: self.mode,
            artifact_length: state.artifact.chars().count(),
        })
        .await;

        let system = build_system_prompt(state.kind, &dimensions);
        let mut history = vec![Message::user(build_task_message(&state))];

        let mut iteration = 0usize;
        let mut parse_errors = 0usize;

        while iteration < self.config.max_iterations && !state.is_complete {
            let turn = iteration + 1;

            let response = match self
                .llm
                .complete(
                    &system,
                    &history,
                    Some(CompletionOptions {
                        temperature: Some(0.2),
                        ..Default::default()
                    }),
                )
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    // Transport errors are fatal for the session; retry, if
                    // any, belongs to the model client.
                    emit(AgentEvent::Error {
                        message: format!("model call failed: {}", e),
                        iteration: Some(turn),
                    })
                    .await;
                    return;
                }
            };

            if let Some(thinking) = parse_thinking(&response) {
                let structured = classify_thinking(&thinking);
                let summary = structured.summary.clone();
                emit(AgentEvent::Thinking {
                    iteration: turn,
                    text: thinking,
                    structured,
                    summary,
                })
                .await;
            }

            match parse_tool_call(&response) {
                ParseOutcome::Missing => {
                    iteration = turn;
                    history.push(Message::assistant(&response));
                    history.push(Message::user(
                        "Your reply did not contain a <tool_call> block. Respond with exactly \
                         one tool call from the catalog, or call complete_workflow if the \
                         analysis is finished.",
                    ));
                }
                ParseOutcome::Malformed(err) => {
                    parse_errors += 1;
                    history.push(Message::assistant(&response));
                    if parse_errors < self.config.max_parse_errors {
                        // Local retry: the iteration counter does not move.
                        history.push(Message::user(format!(
                            "Your tool call could not be parsed: {}. Re-emit it as a single \
                             <tool_call> block containing a JSON object with \"tool\", \
                             \"parameters\", and \"reasoning\" fields.",
                            err
                        )));
                    } else {
                        // Bound reached: force the counter forward so repeated
                        // malformed output cannot stall the session.
                        iteration = turn;
                        parse_errors = 0;
                        history.push(Message::user(format!(
                            "Your last {} tool calls were all malformed (latest problem: {}). \
                             Stop and re-read the tool catalog in the system instructions, then \
                             emit one syntactically valid <tool_call> block and nothing else.",
                            self.config.max_parse_errors, err
                        )));
                    }
                }
                ParseOutcome::Parsed(call) => {
                    parse_errors = 0;
                    iteration = turn;

                    emit(AgentEvent::Action {
                        iteration: turn,
                        tool: call.name.to_string(),
                        parameters: Value::Object(call.parameters.clone()),
                        justification: call.reasoning.clone(),
                    })
                    .await;

                    let result = self.executor.execute(&call, &mut state).await;

                    emit(AgentEvent::Observation {
                        iteration: turn,
                        tool: call.name.to_string(),
                        success: result.success,
                        summary: result.summary.clone(),
                        error: result.error.clone(),
                    })
                    .await;

                    if call.name == ToolName::GenerateSuggestion && result.success {
                        // The handler just appended it.
                        if let Some(suggestion) = state.suggestions.last().cloned() {
                            emit(AgentEvent::Suggestion {
                                suggestion: suggestion.clone(),
                            })
                            .await;

                            if self.mode == RunMode::Review
                                && !self.pause_for_caller(&emit, "suggestion", &suggestion).await
                            {
                                return;
                            }
                        }
                    }

                    history.push(Message::assistant(&response));
                    history.push(Message::user(format_observation(&call, &result)));
                }
            }

            trim_history(&mut history, self.config.history_rounds);
        }

        if self.mode == RunMode::Plan && !state.suggestions.is_empty() {
            let aggregates = aggregate(&state.suggestions, &dimensions);
            emit(AgentEvent::PlanReady {
                session_id: self.session_id.clone(),
                suggestions: state.suggestions.clone(),
                aggregates: aggregates.clone(),
                observations: state.observations.clone(),
                summary: state.summary.clone(),
                quality: state.quality.clone(),
            })
            .await;

            let payload = json!({
                "suggestion_count": state.suggestions.len(),
                "by_severity": aggregates.by_severity,
                "by_dimension": aggregates.by_dimension,
            });
            if !self
                .pause_for_payload(&emit, "plan", payload, self.config.plan_pause_secs)
                .await
            {
                // Already-produced suggestions stand; the caller saw them in
                // the plan_ready event.
                return;
            }
        }

        emit(AgentEvent::WorkflowComplete {
            session_id: self.session_id.clone(),
            total_iterations: iteration,
            total_suggestions: state.suggestions.len(),
            total_observations: state.observations.len(),
            summary: state.summary.clone(),
            quality: state.quality.clone(),
        })
        .await;
    }

    /// Suspend after an accepted suggestion (review mode).
    ///
    /// Returns false when the session must terminate.
    async fn pause_for_caller<F, Fut>(&self, emit: &F, reason: &str, suggestion: &Suggestion) -> bool
    where
        F: Fn(AgentEvent) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let payload = serde_json::to_value(suggestion).unwrap_or(Value::Null);
        self.pause_for_payload(emit, reason, payload, self.config.review_pause_secs)
            .await
    }

    /// Common suspend path: emit `workflow_paused`, mark the session paused,
    /// and block on the store's bounded wait.
    async fn pause_for_payload<F, Fut>(
        &self,
        emit: &F,
        reason: &str,
        payload: Value,
        bound_secs: u64,
    ) -> bool
    where
        F: Fn(AgentEvent) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        emit(AgentEvent::WorkflowPaused {
            session_id: self.session_id.clone(),
            reason: reason.to_string(),
            payload,
        })
        .await;
        self.sessions.pause(&self.session_id);

        let outcome = self
            .sessions
            .wait_for_resume(&self.session_id, Duration::from_secs(bound_secs))
            .await;

        match outcome {
            WaitOutcome::Resumed => {
                emit(AgentEvent::WorkflowResumed {
                    session_id: self.session_id.clone(),
                })
                .await;
                true
            }
            WaitOutcome::Cancelled | WaitOutcome::TimedOut => {
                let cause = if outcome == WaitOutcome::Cancelled {
                    "cancelled by caller"
                } else {
                    "timed out awaiting caller decision"
                };
                emit(AgentEvent::Error {
                    message: format!("session paused for {} was {}", reason, cause),
                    iteration: None,
                })
                .await;
                false
            }
        }
    }
}

/// Keep the seed turn plus the most recent `rounds` assistant/user rounds
fn trim_history(history: &mut Vec<Message>, rounds: usize) {
    let keep_tail = rounds * 2;
    if history.len() > keep_tail + 1 {
        let drop = history.len() - keep_tail - 1;
        history.drain(1..1 + drop);
    }
}

/// Fixed system framing: role guidance per artifact kind, the dimension list,
/// the tool catalog, and the tagged-block protocol.
fn build_system_prompt(kind: ArtifactKind, dimensions: &[Dimension]) -> String {
    let role = match kind {
        ArtifactKind::Implementation => {
            "You audit an implementation prompt: the specification a developer (or a code \
             generator) receives to build one feature. Judge whether it is complete and precise \
             enough to implement from, without guessing."
        }
        ArtifactKind::Review => {
            "You audit a review prompt: the checklist a reviewer receives to evaluate one \
             feature's implementation. Judge whether it covers the feature's contract and gives \
             the reviewer actionable criteria."
        }
    };

    let mut dims = String::new();
    for d in dimensions {
        dims.push_str(&format!("- {} ({}): weight {:.1}\n", d.display_name, d.id, d.weight));
    }

    format!(
        "You are a prompt-quality analyst working in a Thought -> Action -> Observation loop.\n\
         {role}\n\n\
         ## Quality Dimensions\n{dims}\n\
         {catalog}\n\
         ## Protocol\n\
         - Optionally reason inside one <thinking>...</thinking> block.\n\
         - Then emit exactly one <tool_call>...</tool_call> block containing a JSON object \
         with \"tool\", \"parameters\", and \"reasoning\" fields.\n\
         - One tool call per turn. Read the observation before the next call.\n\
         - Record findings with generate_suggestion and record_observation.\n\
         - When every dimension is covered, call complete_workflow with a summary and a \
         quality verdict.\n",
        role = role,
        dims = dims,
        catalog = render_catalog(),
    )
}

/// Seed user turn describing the artifact and the task
fn build_task_message(state: &AgentState) -> String {
    let feature = &state.context.feature;
    let project = &state.context.project;
    format!(
        "Project: {} ({})\nFeature: {} — {}\nSystem/module: {}/{}\nDeclared inputs: {}\n\
         Declared outputs: {}\n\nAnalyze the following {} prompt:\n\n---\n{}\n---\n\n\
         Work through the quality dimensions one at a time, then complete the workflow.",
        project.name,
        project.architecture,
        feature.name,
        feature.description,
        feature.system,
        feature.module,
        feature.inputs.join(", "),
        feature.outputs.join(", "),
        state.kind,
        state.artifact,
    )
}

/// Observation turn folded back into history for the next model call
fn format_observation(call: &ToolCall, result: &ToolResult) -> String {
    let status = if result.success { "ok" } else { "error" };
    let data = if result.data.is_empty() {
        String::new()
    } else {
        format!(
            "\n{}",
            serde_json::to_string_pretty(&result.data).unwrap_or_default()
        )
    };
    format!(
        "Observation for {} ({}): {}{}",
        call.name, status, result.summary, data
    )
}

/// Suggestion counts by severity and by dimension, in stable order
fn aggregate(suggestions: &[Suggestion], dimensions: &[Dimension]) -> PlanAggregates {
    let by_severity = ["high", "medium", "low"]
        .iter()
        .map(|sev| {
            let count = suggestions
                .iter()
                .filter(|s| s.severity.to_string() == *sev)
                .count();
            (sev.to_string(), count)
        })
        .filter(|(_, count)| *count > 0)
        .collect();

    let mut dimension_order: Vec<String> = dimensions.iter().map(|d| d.id.clone()).collect();
    for s in suggestions {
        if !dimension_order.contains(&s.dimension) {
            dimension_order.push(s.dimension.clone());
        }
    }
    let by_dimension = dimension_order
        .into_iter()
        .map(|dim| {
            let count = suggestions.iter().filter(|s| s.dimension == dim).count();
            (dim, count)
        })
        .filter(|(_, count)| *count > 0)
        .collect();

    PlanAggregates {
        by_severity,
        by_dimension,
    }
}
