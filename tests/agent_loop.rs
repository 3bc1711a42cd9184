//! Agent loop behavior tests
//!
//! Drives the loop against scripted model responses and asserts on the event
//! stream: ordering, bound enforcement, and the mode-specific suspend paths.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

use common::{fast_config, tool_turn, ScriptedClient};
use rubric::agent::{AgentEvent, AgentLoop, AgentState};
use rubric::core::{AgentConfig, DimensionTables};
use rubric::tools::ToolExecutor;
use rubric::{
    ArtifactKind, Dimension, InMemorySessionStore, RunMode, SessionStatus, SessionStore,
};

const SESSION: &str = "sess-1";

const ARTIFACT: &str = "Implement the login flow. Accept an email and password, validate them \
against the accounts store, and return a session token. On invalid credentials return an error \
response without revealing which field was wrong. Steps: parse input, verify hash, mint token.";

#[derive(Clone, Copy)]
enum Control {
    Resume,
    Cancel,
}

fn dimensions() -> Vec<Dimension> {
    DimensionTables::default().defaults_for(ArtifactKind::Implementation)
}

/// Run the loop to its terminal event, optionally answering each pause
async fn run_loop(
    client: ScriptedClient,
    mode: RunMode,
    config: AgentConfig,
    control: Option<Control>,
) -> Vec<AgentEvent> {
    let sessions = Arc::new(InMemorySessionStore::new());
    sessions.register(SESSION, "p1");

    let dims = dimensions();
    let agent = AgentLoop::new(
        Arc::new(client),
        ToolExecutor::new(dims.clone()),
        sessions.clone(),
        SESSION,
        mode,
        config,
    );
    let state = AgentState::new(
        ARTIFACT.to_string(),
        ArtifactKind::Implementation,
        common::context(),
    );

    let (tx, mut rx) = mpsc::channel(64);
    let handle = tokio::spawn(agent.run(state, dims, tx));

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        if matches!(event, AgentEvent::WorkflowPaused { .. }) {
            if let Some(control) = control {
                let sessions = sessions.clone();
                tokio::spawn(async move {
                    // Wait until the loop has actually marked itself paused.
                    for _ in 0..500 {
                        let paused = sessions
                            .get(SESSION)
                            .map(|i| i.status == SessionStatus::Paused)
                            .unwrap_or(false);
                        if paused {
                            break;
                        }
                        tokio::time::sleep(Duration::from_millis(2)).await;
                    }
                    match control {
                        Control::Resume => sessions.resume(SESSION),
                        Control::Cancel => sessions.cancel(SESSION),
                    };
                });
            }
        }
        events.push(event);
    }
    handle.await.expect("loop task panicked");
    events
}

fn event_types(events: &[AgentEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.event_type()).collect()
}

fn suggestion_turn() -> String {
    tool_turn(
        "The failure path is undocumented.",
        "generate_suggestion",
        json!({
            "dimension": "completeness",
            "severity": "high",
            "problem": "no error handling described",
            "suggested_text": "Describe the response for invalid credentials.",
            "justification": "implementers must handle the failure path",
        }),
    )
}

fn complete_turn() -> String {
    tool_turn(
        "",
        "complete_workflow",
        json!({"summary": "one gap found", "quality": "fair"}),
    )
}

#[tokio::test]
async fn test_auto_run_event_ordering() {
    let client = ScriptedClient::new(vec![
        tool_turn("Check the basics first.", "check_completeness", json!({})),
        suggestion_turn(),
        complete_turn(),
    ]);
    let events = run_loop(client, RunMode::Auto, fast_config(), None).await;

    let types = event_types(&events);
    assert_eq!(types.first(), Some(&"workflow_start"));
    assert_eq!(types.last(), Some(&"workflow_complete"));
    // Exactly one terminal event.
    assert_eq!(
        types
            .iter()
            .filter(|t| **t == "workflow_complete" || **t == "error")
            .count(),
        1
    );

    // The suggestion event immediately follows its producing observation.
    let obs = types
        .iter()
        .position(|t| *t == "suggestion")
        .expect("suggestion event present");
    assert_eq!(types[obs - 1], "observation");

    match events.last() {
        Some(AgentEvent::WorkflowComplete {
            total_iterations,
            total_suggestions,
            summary,
            quality,
            ..
        }) => {
            assert_eq!(*total_iterations, 3);
            assert_eq!(*total_suggestions, 1);
            assert_eq!(summary, "one gap found");
            assert_eq!(quality, "fair");
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }
}

#[tokio::test]
async fn test_thinking_events_carry_classification() {
    let client = ScriptedClient::new(vec![
        tool_turn(
            "Retrieve project conventions first. The artifact says \"mint token\".",
            "check_completeness",
            json!({}),
        ),
        complete_turn(),
    ]);
    let events = run_loop(client, RunMode::Auto, fast_config(), None).await;

    let thinking = events
        .iter()
        .find_map(|e| match e {
            AgentEvent::Thinking {
                iteration,
                structured,
                ..
            } => Some((*iteration, structured.clone())),
            _ => None,
        })
        .expect("thinking event present");
    assert_eq!(thinking.0, 1);
    assert!(!thinking.1.steps.is_empty());
}

#[tokio::test]
async fn test_malformed_retries_do_not_consume_iterations() {
    let malformed = "<tool_call>{not valid json</tool_call>".to_string();
    let client = ScriptedClient::new(vec![malformed.clone(), malformed, complete_turn()]);
    let events = run_loop(client, RunMode::Auto, fast_config(), None).await;

    // Two malformed turns below the bound cost nothing.
    match events.last() {
        Some(AgentEvent::WorkflowComplete { total_iterations, .. }) => {
            assert_eq!(*total_iterations, 1)
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }
    // Malformed turns produce neither action nor error events; the only
    // action comes from the final valid call.
    let types = event_types(&events);
    assert_eq!(types.iter().filter(|t| **t == "action").count(), 1);
    assert_eq!(types.iter().filter(|t| **t == "error").count(), 0);
}

#[tokio::test]
async fn test_malformed_bound_forces_progress() {
    let malformed = "<tool_call>{\"tool\": \"no_such_tool\", \"parameters\": {}}</tool_call>";
    let client = ScriptedClient::new(vec![
        malformed.to_string(),
        malformed.to_string(),
        malformed.to_string(),
        complete_turn(),
    ]);
    let events = run_loop(client, RunMode::Auto, fast_config(), None).await;

    // The third consecutive malformed turn consumes an iteration.
    match events.last() {
        Some(AgentEvent::WorkflowComplete { total_iterations, .. }) => {
            assert_eq!(*total_iterations, 2)
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_tool_block_consumes_iteration() {
    let client = ScriptedClient::new(vec![
        "This prompt looks complete to me.".to_string(),
        complete_turn(),
    ]);
    let events = run_loop(client, RunMode::Auto, fast_config(), None).await;

    match events.last() {
        Some(AgentEvent::WorkflowComplete { total_iterations, .. }) => {
            assert_eq!(*total_iterations, 2)
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }
}

#[tokio::test]
async fn test_iteration_cap_ends_with_workflow_complete() {
    let mut config = fast_config();
    config.max_iterations = 3;
    let client = ScriptedClient::with_fallback(
        vec![],
        tool_turn(
            "",
            "record_observation",
            json!({"content": "still looking"}),
        ),
    );
    let events = run_loop(client, RunMode::Auto, config, None).await;

    match events.last() {
        Some(AgentEvent::WorkflowComplete {
            total_iterations,
            total_observations,
            summary,
            ..
        }) => {
            assert_eq!(*total_iterations, 3);
            assert_eq!(*total_observations, 3);
            assert!(summary.is_empty());
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }
}

#[tokio::test]
async fn test_model_failure_is_a_hard_stop() {
    let client = ScriptedClient::then_fail(
        vec![tool_turn("", "check_completeness", json!({}))],
        "connection refused",
    );
    let events = run_loop(client, RunMode::Auto, fast_config(), None).await;

    let types = event_types(&events);
    assert!(!types.contains(&"workflow_complete"));
    match events.last() {
        Some(AgentEvent::Error { message, iteration }) => {
            assert!(message.contains("connection refused"));
            assert_eq!(*iteration, Some(2));
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }
}

#[tokio::test]
async fn test_review_mode_pauses_after_each_suggestion() {
    let mut config = fast_config();
    config.review_pause_secs = 5;
    let client = ScriptedClient::new(vec![suggestion_turn(), complete_turn()]);
    let events = run_loop(client, RunMode::Review, config, Some(Control::Resume)).await;

    let types = event_types(&events);
    let pause = types
        .iter()
        .position(|t| *t == "workflow_paused")
        .expect("pause event present");
    assert_eq!(types[pause - 1], "suggestion");
    assert_eq!(types[pause + 1], "workflow_resumed");
    assert_eq!(types.last(), Some(&"workflow_complete"));
}

#[tokio::test]
async fn test_review_timeout_keeps_suggestions_and_errors_out() {
    // Pause bound of zero: no caller decision can ever arrive in time.
    let client = ScriptedClient::new(vec![suggestion_turn(), complete_turn()]);
    let events = run_loop(client, RunMode::Review, fast_config(), None).await;

    let types = event_types(&events);
    let tail: Vec<_> = types.iter().rev().take(3).rev().collect();
    assert_eq!(tail, vec![&"suggestion", &"workflow_paused", &"error"]);
    assert!(!types.contains(&"workflow_complete"));
}

#[tokio::test]
async fn test_review_cancel_terminates_with_error() {
    let mut config = fast_config();
    config.review_pause_secs = 5;
    let client = ScriptedClient::new(vec![suggestion_turn(), complete_turn()]);
    let events = run_loop(client, RunMode::Review, config, Some(Control::Cancel)).await;

    match events.last() {
        Some(AgentEvent::Error { message, .. }) => {
            assert!(message.contains("cancelled"));
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }
}

#[tokio::test]
async fn test_plan_mode_pauses_once_with_full_plan() {
    let mut config = fast_config();
    config.plan_pause_secs = 5;
    let client = ScriptedClient::new(vec![suggestion_turn(), complete_turn()]);
    let events = run_loop(client, RunMode::Plan, config, Some(Control::Resume)).await;

    let types = event_types(&events);
    // No mid-run pause in plan mode: the single pause follows plan_ready.
    assert_eq!(
        types.iter().filter(|t| **t == "workflow_paused").count(),
        1
    );
    let ready = types
        .iter()
        .position(|t| *t == "plan_ready")
        .expect("plan_ready event present");
    assert_eq!(types[ready + 1], "workflow_paused");
    assert_eq!(types[ready + 2], "workflow_resumed");
    assert_eq!(types.last(), Some(&"workflow_complete"));

    match &events[ready] {
        AgentEvent::PlanReady {
            suggestions,
            aggregates,
            ..
        } => {
            assert_eq!(suggestions.len(), 1);
            assert_eq!(aggregates.by_severity, vec![("high".to_string(), 1)]);
        }
        other => panic!("unexpected event at plan position: {:?}", other),
    }
}

#[tokio::test]
async fn test_plan_confirmation_timeout_is_terminal() {
    let client = ScriptedClient::new(vec![suggestion_turn(), complete_turn()]);
    let events = run_loop(client, RunMode::Plan, fast_config(), None).await;

    let types = event_types(&events);
    assert!(types.contains(&"plan_ready"));
    assert_eq!(types.last(), Some(&"error"));
}

#[tokio::test]
async fn test_plan_mode_without_suggestions_skips_the_pause() {
    let client = ScriptedClient::new(vec![complete_turn()]);
    let events = run_loop(client, RunMode::Plan, fast_config(), None).await;

    let types = event_types(&events);
    assert!(!types.contains(&"plan_ready"));
    assert!(!types.contains(&"workflow_paused"));
    assert_eq!(types.last(), Some(&"workflow_complete"));
}
