//! Shared types used across rubric modules
//!
//! Contains messages, the optimization context bundle, suggestions, and the
//! mode/kind enums selected by callers.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A message in the model conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Which of the two artifact texts of a feature is analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// The implementation prompt (versioned on write)
    Implementation,
    /// The review prompt (overwritten in place)
    Review,
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "implementation" => Ok(Self::Implementation),
            "review" => Ok(Self::Review),
            other => Err(format!("unknown artifact kind '{}'", other)),
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Implementation => write!(f, "implementation"),
            Self::Review => write!(f, "review"),
        }
    }
}

/// Suspend policy for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// No suspension, runs to completion or iteration cap
    Auto,
    /// Suspends after every accepted suggestion pending caller resume
    Review,
    /// Suspends once after the full analysis pending caller confirmation
    Plan,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "review" => Ok(Self::Review),
            "plan" => Ok(Self::Plan),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Review => write!(f, "review"),
            Self::Plan => write!(f, "plan"),
        }
    }
}

/// A named quality axis with a display name and priority weight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    /// Stable identifier, e.g. "completeness"
    pub id: String,
    /// Human-readable name shown in events
    pub display_name: String,
    /// Priority weight, copied onto suggestions tagged with this dimension
    pub weight: f32,
}

impl Dimension {
    /// Create a dimension
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, weight: f32) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            weight,
        }
    }
}

/// Severity of a suggestion or check issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// A discrete, addressable recommendation to modify the artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Unique within a session, e.g. "s-003"
    pub id: String,
    /// Dimension id this suggestion is tagged with
    pub dimension: String,
    pub severity: Severity,
    /// What is wrong
    pub problem: String,
    /// Text span to replace, if the model quoted one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    /// Replacement or addition text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_text: Option<String>,
    /// Why the change helps
    pub justification: String,
    /// Priority weight drawn from the dimension's configuration
    pub weight: f32,
}

/// A declared dependency edge between two modules of the project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDependency {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Project-level metadata surrounding the analyzed feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectContext {
    pub id: String,
    pub name: String,
    /// Free-form architecture summary
    pub architecture: String,
    /// Declared technologies, e.g. ["rust", "tokio", "postgres"]
    pub tech_stack: Vec<String>,
    /// Declared inter-module dependency edges
    pub module_dependencies: Vec<ModuleDependency>,
}

/// The unit being analyzed: one feature and its declared contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureContext {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Declared inputs of the feature
    pub inputs: Vec<String>,
    /// Declared outputs of the feature
    pub outputs: Vec<String>,
    /// System the feature belongs to in the project hierarchy
    pub system: String,
    /// Module within that system
    pub module: String,
}

/// Maximum number of sibling features kept for cross-reference
pub const MAX_SIBLINGS: usize = 8;

/// Immutable per-session bundle built once at session start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationContext {
    pub project: ProjectContext,
    pub feature: FeatureContext,
    /// Sibling features in the same module, bounded at construction
    pub siblings: Vec<FeatureContext>,
}

impl OptimizationContext {
    /// Build the context, truncating the sibling list to [`MAX_SIBLINGS`]
    pub fn new(
        project: ProjectContext,
        feature: FeatureContext,
        mut siblings: Vec<FeatureContext>,
    ) -> Self {
        siblings.truncate(MAX_SIBLINGS);
        Self {
            project,
            feature,
            siblings,
        }
    }
}
