//! Heuristic classification of free-text reasoning
//!
//! Splits a thinking block into steps, tags each with a coarse kind by
//! keyword match, pulls out quoted evidence, and scores confidence from
//! certainty/hedging vocabulary. Best-effort annotation for observability
//! only; nothing downstream depends on it being right.

use serde::Serialize;

/// Coarse kind of one reasoning line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingStepKind {
    Analysis,
    Retrieval,
    Comparison,
    Decision,
    Verification,
}

/// Heuristic confidence of the whole block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// One classified reasoning line
#[derive(Debug, Clone, Serialize)]
pub struct ThinkingStep {
    pub kind: ThinkingStepKind,
    pub text: String,
    /// Double-quoted substrings found in the line
    pub evidence: Vec<String>,
}

/// Classified view of a whole thinking block; emitted once, never persisted
#[derive(Debug, Clone, Serialize)]
pub struct StructuredThinking {
    pub steps: Vec<ThinkingStep>,
    pub confidence: Confidence,
    /// Last non-empty line, used as the running summary
    pub summary: String,
}

// First matching category wins; Analysis is the fallback.
const RETRIEVAL_WORDS: &[&str] = &["retriev", "search", "look up", "fetch", "query", "context"];
const COMPARISON_WORDS: &[&str] = &["compar", "versus", "difference", "whereas", "contrast"];
const DECISION_WORDS: &[&str] = &["decide", "will call", "choose", "therefore", "next step", "plan to"];
const VERIFICATION_WORDS: &[&str] = &["verify", "confirm", "double-check", "validate", "re-check"];

const CERTAINTY_WORDS: &[&str] = &["clearly", "definitely", "certainly", "confirmed", "obvious"];
const HEDGING_WORDS: &[&str] = &["might", "maybe", "possibly", "perhaps", "unclear", "not sure"];

fn classify_line(line: &str) -> ThinkingStepKind {
    let lower = line.to_lowercase();
    let hit = |words: &[&str]| words.iter().any(|w| lower.contains(w));
    if hit(RETRIEVAL_WORDS) {
        ThinkingStepKind::Retrieval
    } else if hit(COMPARISON_WORDS) {
        ThinkingStepKind::Comparison
    } else if hit(DECISION_WORDS) {
        ThinkingStepKind::Decision
    } else if hit(VERIFICATION_WORDS) {
        ThinkingStepKind::Verification
    } else {
        ThinkingStepKind::Analysis
    }
}

fn extract_quotes(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = line;
    while let Some(start) = rest.find('"') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('"') else { break };
        let quoted = after[..end].trim();
        if !quoted.is_empty() {
            out.push(quoted.to_string());
        }
        rest = &after[end + 1..];
    }
    out
}

/// Classify a free-text thinking block
pub fn classify_thinking(text: &str) -> StructuredThinking {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let steps = lines
        .iter()
        .map(|line| ThinkingStep {
            kind: classify_line(line),
            text: line.to_string(),
            evidence: extract_quotes(line),
        })
        .collect();

    let lower = text.to_lowercase();
    let confidence = if CERTAINTY_WORDS.iter().any(|w| lower.contains(w)) {
        Confidence::High
    } else if HEDGING_WORDS.iter().any(|w| lower.contains(w)) {
        Confidence::Low
    } else {
        Confidence::Medium
    };

    StructuredThinking {
        steps,
        confidence,
        summary: lines.last().map(ToString::to_string).unwrap_or_default(),
    }
}
