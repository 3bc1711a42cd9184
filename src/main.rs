//! Rubric - Agentic Prompt Quality Analysis
//!
//! Main entry point for the CLI application.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;

use rubric::workflow::FeatureRecord;
use rubric::{
    AgentEvent, ArtifactKind, Config, InMemoryPromptStore, InMemorySessionStore, OllamaClient,
    OptimizationRequest, Orchestrator, RunMode,
};
use rubric::core::{FeatureContext, ProjectContext};

/// Rubric - Agentic Prompt Quality Analysis
#[derive(Parser, Debug)]
#[command(name = "rubric")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Prompt file to analyze
    file: PathBuf,

    /// Artifact kind: implementation or review
    #[arg(long, short = 'k', default_value = "implementation")]
    kind: ArtifactKind,

    /// Operating mode: auto, review, or plan
    #[arg(long, short = 'm', default_value = "auto")]
    mode: RunMode,

    /// Comma-separated dimension ids (defaults per kind when omitted)
    #[arg(long, value_delimiter = ',')]
    dimensions: Option<Vec<String>>,

    /// Feature name the prompt belongs to
    #[arg(long, default_value = "feature")]
    feature: String,

    /// Project name shown to the model
    #[arg(long, default_value = "project")]
    project: String,

    /// Model name override
    #[arg(long)]
    model: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.model.name = model.clone();
    }
    if args.debug {
        config.agent.debug = true;
    }

    let artifact = tokio::fs::read_to_string(&args.file).await?;

    let prompts = Arc::new(InMemoryPromptStore::new());
    prompts.insert_project(
        ProjectContext {
            id: "local".to_string(),
            name: args.project.clone(),
            architecture: String::new(),
            tech_stack: vec![],
            module_dependencies: vec![],
        },
        vec![FeatureRecord {
            feature: FeatureContext {
                id: "target".to_string(),
                name: args.feature.clone(),
                description: format!("prompt loaded from {}", args.file.display()),
                inputs: vec![],
                outputs: vec![],
                system: "default".to_string(),
                module: "default".to_string(),
            },
            implementation_versions: vec![artifact.clone()],
            review_prompt: artifact,
        }],
    );

    let llm = Arc::new(OllamaClient::from_config(&config)?);
    let sessions = Arc::new(InMemorySessionStore::new());
    let orchestrator = Orchestrator::new(llm, prompts, sessions, config);

    let mut events = orchestrator
        .start_optimization(OptimizationRequest {
            project_id: "local".to_string(),
            feature_id: "target".to_string(),
            kind: args.kind,
            mode: args.mode,
            dimensions: args.dimensions.clone(),
        })
        .await;

    while let Some(event) = events.next().await {
        print!("{}", event.to_sse());

        if let AgentEvent::WorkflowPaused { session_id, reason, .. } = &event {
            eprintln!("paused ({}). [r]esume / [c]ancel?", reason);
            let decision = read_decision().await?;
            if decision.starts_with('c') {
                orchestrator.cancel_session(session_id);
            } else {
                orchestrator.resume_session(session_id);
            }
        }
    }

    Ok(())
}

async fn read_decision() -> anyhow::Result<String> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok::<_, std::io::Error>(line.trim().to_ascii_lowercase())
    })
    .await?
    .map_err(Into::into)
}
