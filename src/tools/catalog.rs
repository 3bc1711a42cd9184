//! Tool catalog - the fixed set of tools the agent may invoke
//!
//! Tool names are a closed enum so dispatch is exhaustive and adding a tool
//! is a compile-time-checked change. The catalog drives both validation of
//! parsed tool calls and the instruction text rendered into the system
//! prompt.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every tool the agent can call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Vector-similarity retrieval over project documents
    RagRetrieve,
    /// Declared metadata of the analyzed feature or a named sibling
    GetFeatureContext,
    /// Declared module dependencies relevant to the feature
    GetDependencies,
    /// Rule-based completeness check over the artifact text
    CheckCompleteness,
    /// Rule-based input/output interface check
    CheckInterface,
    /// Rule-based dependency-mention check
    CheckDependency,
    /// Delegated structured model check across dimensions
    DeepCheck,
    /// Record a concrete improvement suggestion
    GenerateSuggestion,
    /// Record a free-form analysis observation
    RecordObservation,
    /// Finish the analysis with a summary and quality verdict
    CompleteWorkflow,
}

impl ToolName {
    /// Wire name used in the tagged tool-call block
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RagRetrieve => "rag_retrieve",
            Self::GetFeatureContext => "get_feature_context",
            Self::GetDependencies => "get_dependencies",
            Self::CheckCompleteness => "check_completeness",
            Self::CheckInterface => "check_interface",
            Self::CheckDependency => "check_dependency",
            Self::DeepCheck => "deep_check",
            Self::GenerateSuggestion => "generate_suggestion",
            Self::RecordObservation => "record_observation",
            Self::CompleteWorkflow => "complete_workflow",
        }
    }
}

impl FromStr for ToolName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "rag_retrieve" => Ok(Self::RagRetrieve),
            "get_feature_context" => Ok(Self::GetFeatureContext),
            "get_dependencies" => Ok(Self::GetDependencies),
            "check_completeness" => Ok(Self::CheckCompleteness),
            "check_interface" => Ok(Self::CheckInterface),
            "check_dependency" => Ok(Self::CheckDependency),
            "deep_check" => Ok(Self::DeepCheck),
            "generate_suggestion" => Ok(Self::GenerateSuggestion),
            "record_observation" => Ok(Self::RecordObservation),
            "complete_workflow" => Ok(Self::CompleteWorkflow),
            other => Err(format!("unknown tool '{}'", other)),
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named parameter of a tool
#[derive(Debug, Clone)]
pub struct ToolParameter {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// Static description of one tool
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: ToolName,
    pub description: &'static str,
    pub parameters: Vec<ToolParameter>,
    /// What the observation fed back to the model contains
    pub returns: &'static str,
}

impl ToolDefinition {
    /// Names of all required parameters
    pub fn required_parameters(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
    }
}

fn param(name: &'static str, description: &'static str, required: bool) -> ToolParameter {
    ToolParameter {
        name,
        description,
        required,
    }
}

/// Build the full tool catalog
pub fn tool_catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: ToolName::RagRetrieve,
            description: "Search project documents for passages relevant to a query",
            parameters: vec![
                param("query", "What to search for", true),
                param("top_k", "Maximum number of passages (default 3)", false),
            ],
            returns: "Ranked passages with source and truncated content",
        },
        ToolDefinition {
            name: ToolName::GetFeatureContext,
            description: "Fetch declared metadata of the analyzed feature or a sibling feature",
            parameters: vec![param(
                "feature_name",
                "Sibling feature name; omit for the analyzed feature",
                false,
            )],
            returns: "Feature identity, description, inputs, outputs, hierarchy position",
        },
        ToolDefinition {
            name: ToolName::GetDependencies,
            description: "List declared module dependencies touching the feature's module",
            parameters: vec![],
            returns: "Dependency edges with direction and description",
        },
        ToolDefinition {
            name: ToolName::CheckCompleteness,
            description: "Rule-based check that the artifact covers required sections and declared inputs/outputs",
            parameters: vec![],
            returns: "Pass/fail verdict plus typed issues with severity",
        },
        ToolDefinition {
            name: ToolName::CheckInterface,
            description: "Rule-based check that declared inputs and outputs are described in the artifact",
            parameters: vec![],
            returns: "Pass/fail verdict plus typed issues with severity",
        },
        ToolDefinition {
            name: ToolName::CheckDependency,
            description: "Rule-based check that declared module dependencies are mentioned in the artifact",
            parameters: vec![],
            returns: "Pass/fail verdict plus typed issues with severity",
        },
        ToolDefinition {
            name: ToolName::DeepCheck,
            description: "Delegate a structured model-based check across quality dimensions",
            parameters: vec![param(
                "dimensions",
                "Comma-separated dimension ids; omit for all active dimensions",
                false,
            )],
            returns: "Per-dimension findings, or a skipped notice when no deep checker is configured",
        },
        ToolDefinition {
            name: ToolName::GenerateSuggestion,
            description: "Record one concrete improvement suggestion for the artifact",
            parameters: vec![
                param("dimension", "Dimension id the suggestion addresses", true),
                param("severity", "high, medium, or low", true),
                param("problem", "What is wrong", true),
                param("justification", "Why the change helps", true),
                param("original_text", "Verbatim artifact span to replace", false),
                param("suggested_text", "Replacement or addition text", false),
            ],
            returns: "The generated suggestion id",
        },
        ToolDefinition {
            name: ToolName::RecordObservation,
            description: "Record a free-form analysis note that is not itself a suggestion",
            parameters: vec![param("content", "The observation text", true)],
            returns: "The observation index",
        },
        ToolDefinition {
            name: ToolName::CompleteWorkflow,
            description: "Finish the analysis; call once all dimensions are covered",
            parameters: vec![
                param("summary", "Closing summary of the analysis", true),
                param(
                    "quality",
                    "Overall verdict: excellent, good, fair, or poor",
                    true,
                ),
            ],
            returns: "Confirmation that the session is complete",
        },
    ]
}

/// Find a tool's definition in the catalog
pub fn definition_for(name: ToolName) -> ToolDefinition {
    // The catalog covers every ToolName variant, so the lookup always hits.
    tool_catalog()
        .into_iter()
        .find(|d| d.name == name)
        .unwrap_or(ToolDefinition {
            name,
            description: "",
            parameters: vec![],
            returns: "",
        })
}

/// Render the catalog as instruction text for the system prompt
pub fn render_catalog() -> String {
    let mut out = String::from("## Available Tools\n");
    for def in tool_catalog() {
        out.push_str(&format!("\n### {}\n{}\n", def.name, def.description));
        if def.parameters.is_empty() {
            out.push_str("Parameters: none\n");
        } else {
            out.push_str("Parameters:\n");
            for p in &def.parameters {
                let marker = if p.required { "required" } else { "optional" };
                out.push_str(&format!("- {} ({}): {}\n", p.name, marker, p.description));
            }
        }
        out.push_str(&format!("Returns: {}\n", def.returns));
    }
    out
}
