//! Workflow orchestration
//!
//! Owns the lifecycle of optimization sessions: resolves the target artifact
//! and its context, registers the session, spawns the agent loop on its own
//! task, and hands the caller a live event stream. Pause, resume, and cancel
//! pass straight through to the session store; suggestion application is a
//! separate, session-independent operation.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::agent::{AgentEvent, AgentLoop, AgentState};
use crate::core::{
    ArtifactKind, Config, OptimizationContext, Result, RubricError, RunMode, Suggestion,
};
use crate::llm::CompletionClient;
use crate::session::{SessionInfo, SessionStore};
use crate::tools::executor::{DeepChecker, RetrievalService, ToolExecutor};
use crate::workflow::store::PromptStore;

/// Buffer size of a session's event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Parameters of one optimization run
#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    pub project_id: String,
    pub feature_id: String,
    pub kind: ArtifactKind,
    pub mode: RunMode,
    /// Dimension ids to analyze; `None` or empty selects the kind's defaults
    pub dimensions: Option<Vec<String>>,
}

/// Entry point for starting and controlling optimization sessions
pub struct Orchestrator {
    llm: Arc<dyn CompletionClient>,
    prompts: Arc<dyn PromptStore>,
    sessions: Arc<dyn SessionStore>,
    retrieval: Option<Arc<dyn RetrievalService>>,
    deep_checker: Option<Arc<dyn DeepChecker>>,
    config: Config,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        prompts: Arc<dyn PromptStore>,
        sessions: Arc<dyn SessionStore>,
        config: Config,
    ) -> Self {
        Self {
            llm,
            prompts,
            sessions,
            retrieval: None,
            deep_checker: None,
            config,
        }
    }

    /// Attach a retrieval collaborator
    pub fn with_retrieval(mut self, retrieval: Arc<dyn RetrievalService>) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    /// Attach a deep-check collaborator
    pub fn with_deep_checker(mut self, checker: Arc<dyn DeepChecker>) -> Self {
        self.deep_checker = Some(checker);
        self
    }

    /// Start an optimization session and return its live event stream.
    ///
    /// The stream always terminates: resolution failures yield a single
    /// `error` event, everything after successful resolution ends in exactly
    /// one terminal event emitted by the loop.
    pub async fn start_optimization(
        &self,
        request: OptimizationRequest,
    ) -> ReceiverStream<AgentEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let state = match self.resolve(&request).await {
            Ok(state) => state,
            Err(e) => {
                let _ = tx
                    .send(AgentEvent::Error {
                        message: e.to_string(),
                        iteration: None,
                    })
                    .await;
                return ReceiverStream::new(rx);
            }
        };

        let session_id = self.register_session(&request.project_id);
        let dimensions = self
            .config
            .dimensions
            .resolve(request.kind, request.dimensions.as_deref());

        let mut executor = ToolExecutor::new(dimensions.clone());
        if let Some(retrieval) = &self.retrieval {
            executor = executor.with_retrieval(retrieval.clone());
        }
        if let Some(checker) = &self.deep_checker {
            executor = executor.with_deep_checker(checker.clone());
        }

        let agent = AgentLoop::new(
            self.llm.clone(),
            executor,
            self.sessions.clone(),
            session_id.clone(),
            request.mode,
            self.config.agent.clone(),
        );

        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            // Unregister on every exit path, panics included.
            let _guard = SessionGuard {
                sessions,
                id: session_id,
            };
            agent.run(state, dimensions, tx).await;
        });

        ReceiverStream::new(rx)
    }

    /// Apply one suggestion to an artifact and persist the result.
    ///
    /// If the suggestion quotes a span found in the current text, the first
    /// occurrence is replaced; otherwise the suggested text is appended after
    /// a blank line. Returns the updated text.
    pub async fn apply_suggestion(
        &self,
        project_id: &str,
        feature_id: &str,
        kind: ArtifactKind,
        suggestion: &Suggestion,
    ) -> Result<String> {
        let suggested = suggestion
            .suggested_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                RubricError::tool(format!(
                    "suggestion '{}' carries no suggested text to apply",
                    suggestion.id
                ))
            })?;

        let current = self.prompts.artifact(project_id, feature_id, kind).await?;

        let updated = match suggestion
            .original_text
            .as_deref()
            .filter(|span| !span.is_empty() && current.contains(span))
        {
            Some(span) => current.replacen(span, suggested, 1),
            None => {
                if current.trim().is_empty() {
                    suggested.to_string()
                } else {
                    format!("{}\n\n{}", current.trim_end(), suggested)
                }
            }
        };

        self.prompts
            .save_artifact(project_id, feature_id, kind, &updated)
            .await?;
        Ok(updated)
    }

    /// Pause a running session; the loop suspends at its next suspend point
    pub fn pause_session(&self, session_id: &str) -> bool {
        self.sessions.pause(session_id)
    }

    /// Resume a paused session
    pub fn resume_session(&self, session_id: &str) -> bool {
        self.sessions.resume(session_id)
    }

    /// Cancel a session; a suspended loop terminates with an error event
    pub fn cancel_session(&self, session_id: &str) -> bool {
        self.sessions.cancel(session_id)
    }

    /// Current registry view of a session
    pub fn session(&self, session_id: &str) -> Option<SessionInfo> {
        self.sessions.get(session_id)
    }

    async fn resolve(&self, request: &OptimizationRequest) -> Result<AgentState> {
        let project = self.prompts.project(&request.project_id).await?;
        let feature = self
            .prompts
            .feature(&request.project_id, &request.feature_id)
            .await?;
        let siblings = self
            .prompts
            .siblings(&request.project_id, &request.feature_id)
            .await?;
        let artifact = self
            .prompts
            .artifact(&request.project_id, &request.feature_id, request.kind)
            .await?;
        if artifact.trim().is_empty() {
            return Err(RubricError::not_found(format!(
                "feature '{}' has no {} content yet",
                request.feature_id, request.kind
            )));
        }

        let context = OptimizationContext::new(project, feature, siblings);
        Ok(AgentState::new(artifact, request.kind, context))
    }

    fn register_session(&self, project_id: &str) -> String {
        loop {
            let id = format!("opt-{:012x}", rand::random::<u64>() & 0xffff_ffff_ffff);
            if self.sessions.register(&id, project_id) {
                return id;
            }
        }
    }
}

struct SessionGuard {
    sessions: Arc<dyn SessionStore>,
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.unregister(&self.id);
    }
}
