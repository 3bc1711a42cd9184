//! Shared test fixtures
//!
//! Provides a scripted completion client plus context and config builders so
//! loop and orchestrator tests can run without a live model endpoint.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use rubric::core::{
    AgentConfig, FeatureContext, Message, ModuleDependency, OptimizationContext, ProjectContext,
};
use rubric::workflow::FeatureRecord;
use rubric::{CompletionClient, CompletionOptions, InMemoryPromptStore, Result, RubricError};

/// Completion client that replays a fixed script of responses
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String>>>,
    /// Returned once the script is exhausted; exhaustion is an error otherwise
    fallback: Option<String>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            fallback: None,
        }
    }

    /// Replay the script, then keep returning `fallback` forever
    pub fn with_fallback(responses: Vec<String>, fallback: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            fallback: Some(fallback.into()),
        }
    }

    /// Replay the script, then fail with a model error
    pub fn then_fail(responses: Vec<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        let mut script: VecDeque<Result<String>> =
            responses.into_iter().map(Ok).collect();
        script.push_back(Err(RubricError::model(error)));
        Self {
            script: Mutex::new(script),
            fallback: None,
        }
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        _system: &str,
        _history: &[Message],
        _options: Option<CompletionOptions>,
    ) -> Result<String> {
        let next = self
            .script
            .lock()
            .map_err(|_| RubricError::other("script lock poisoned"))?
            .pop_front();
        match next {
            Some(result) => result,
            None => match &self.fallback {
                Some(text) => Ok(text.clone()),
                None => Err(RubricError::model("script exhausted")),
            },
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Render a scripted model turn: optional thinking plus one tool call
pub fn tool_turn(thinking: &str, tool: &str, parameters: Value) -> String {
    let call = serde_json::json!({
        "tool": tool,
        "parameters": parameters,
        "reasoning": "scripted",
    });
    if thinking.is_empty() {
        format!("<tool_call>{}</tool_call>", call)
    } else {
        format!("<thinking>{}</thinking>\n<tool_call>{}</tool_call>", thinking, call)
    }
}

/// A context bundle for a small two-module project
pub fn context() -> OptimizationContext {
    OptimizationContext::new(project(), feature("login", "api"), vec![feature("signup", "api")])
}

pub fn project() -> ProjectContext {
    ProjectContext {
        id: "p1".into(),
        name: "shop".into(),
        architecture: "layered monolith".into(),
        tech_stack: vec!["rust".into(), "postgres".into()],
        module_dependencies: vec![ModuleDependency {
            from: "api".into(),
            to: "storage".into(),
            description: Some("persists accounts".into()),
        }],
    }
}

pub fn feature(name: &str, module: &str) -> FeatureContext {
    FeatureContext {
        id: format!("f-{}", name),
        name: name.into(),
        description: format!("{} flow", name),
        inputs: vec!["email".into(), "password".into()],
        outputs: vec!["session token".into()],
        system: "accounts".into(),
        module: module.into(),
    }
}

/// Loop bounds tuned for tests: tiny caps, immediate pause timeouts
pub fn fast_config() -> AgentConfig {
    AgentConfig {
        max_iterations: 10,
        max_parse_errors: 3,
        history_rounds: 15,
        review_pause_secs: 0,
        plan_pause_secs: 0,
        debug: false,
    }
}

/// Prompt store seeded with the fixture project and one artifact per kind
pub fn seeded_prompts(implementation: &str, review: &str) -> InMemoryPromptStore {
    let store = InMemoryPromptStore::new();
    store.insert_project(
        project(),
        vec![
            FeatureRecord {
                feature: feature("login", "api"),
                implementation_versions: vec![implementation.to_string()],
                review_prompt: review.to_string(),
            },
            FeatureRecord {
                feature: feature("signup", "api"),
                implementation_versions: vec!["signup prompt".to_string()],
                review_prompt: "signup review".to_string(),
            },
        ],
    );
    store
}
