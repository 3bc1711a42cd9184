//! Rule-based artifact checks
//!
//! Pure pattern/keyword analysis over the artifact text and declared feature
//! metadata. No model calls, no I/O; the executor caches each check so it
//! runs at most once per session.

use serde::Serialize;

use crate::core::{FeatureContext, ProjectContext, Severity};

/// One finding produced by a check
#[derive(Debug, Clone, Serialize)]
pub struct CheckIssue {
    pub severity: Severity,
    pub message: String,
}

impl CheckIssue {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Verdict of one rule-based check
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub check: &'static str,
    pub passed: bool,
    pub issues: Vec<CheckIssue>,
}

impl CheckReport {
    fn from_issues(check: &'static str, issues: Vec<CheckIssue>) -> Self {
        // Low-severity findings alone do not fail a check.
        let passed = !issues
            .iter()
            .any(|i| matches!(i.severity, Severity::High | Severity::Medium));
        Self {
            check,
            passed,
            issues,
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Structural completeness: is the artifact substantial and does it address
/// the angles a usable prompt needs?
pub fn check_completeness(artifact: &str, feature: &FeatureContext) -> CheckReport {
    let mut issues = Vec::new();
    let lower = artifact.to_lowercase();

    if artifact.trim().is_empty() {
        issues.push(CheckIssue::new(Severity::High, "artifact is empty"));
        return CheckReport::from_issues("check_completeness", issues);
    }
    if artifact.chars().count() < 200 {
        issues.push(CheckIssue::new(
            Severity::High,
            "artifact is under 200 characters; too short to specify the feature",
        ));
    }
    if !lower.contains(&feature.name.to_lowercase()) {
        issues.push(CheckIssue::new(
            Severity::Medium,
            format!("artifact never names the feature '{}'", feature.name),
        ));
    }
    if !contains_any(&lower, &["error", "fail", "invalid", "exception"]) {
        issues.push(CheckIssue::new(
            Severity::Medium,
            "no error or failure handling is described",
        ));
    }
    if !contains_any(&lower, &["step", "flow", "first", "then", "process"]) {
        issues.push(CheckIssue::new(
            Severity::Low,
            "no step-by-step flow is described",
        ));
    }
    if !contains_any(&lower, &["constraint", "limit", "must", "should"]) {
        issues.push(CheckIssue::new(
            Severity::Low,
            "no constraints or requirements language found",
        ));
    }

    CheckReport::from_issues("check_completeness", issues)
}

/// Interface clarity: every declared input and output must be described.
pub fn check_interface(artifact: &str, feature: &FeatureContext) -> CheckReport {
    let mut issues = Vec::new();
    let lower = artifact.to_lowercase();

    for input in &feature.inputs {
        if !lower.contains(&input.to_lowercase()) {
            issues.push(CheckIssue::new(
                Severity::Medium,
                format!("declared input '{}' is not mentioned", input),
            ));
        }
    }
    for output in &feature.outputs {
        if !lower.contains(&output.to_lowercase()) {
            issues.push(CheckIssue::new(
                Severity::Medium,
                format!("declared output '{}' is not mentioned", output),
            ));
        }
    }
    if feature.inputs.is_empty() && feature.outputs.is_empty() {
        issues.push(CheckIssue::new(
            Severity::Low,
            "feature declares no inputs or outputs; interface check has nothing to verify",
        ));
    }

    CheckReport::from_issues("check_interface", issues)
}

/// Dependency accuracy: modules the feature's module depends on (or that
/// depend on it) should surface in the artifact.
pub fn check_dependency(
    artifact: &str,
    feature: &FeatureContext,
    project: &ProjectContext,
) -> CheckReport {
    let mut issues = Vec::new();
    let lower = artifact.to_lowercase();

    let mut relevant = 0usize;
    for dep in &project.module_dependencies {
        let other = if dep.from == feature.module {
            Some(&dep.to)
        } else if dep.to == feature.module {
            Some(&dep.from)
        } else {
            None
        };
        let Some(other) = other else { continue };
        relevant += 1;
        if !lower.contains(&other.to_lowercase()) {
            issues.push(CheckIssue::new(
                Severity::Medium,
                format!(
                    "declared dependency between '{}' and '{}' is not reflected in the artifact",
                    feature.module, other
                ),
            ));
        }
    }
    if relevant == 0 {
        issues.push(CheckIssue::new(
            Severity::Low,
            "no declared dependencies touch this feature's module",
        ));
    }

    CheckReport::from_issues("check_dependency", issues)
}
