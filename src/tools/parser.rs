//! Tool-call and reasoning-block parsing
//!
//! The model replies with up to two tagged regions: a free-text
//! `<thinking>` block and a structured `<tool_call>` block holding a JSON
//! object with `tool`, `parameters`, and `reasoning` fields. An absent block
//! and a malformed block are distinct outcomes because the agent loop treats
//! them differently.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::tools::catalog::{definition_for, ToolName};

const TOOL_OPEN: &str = "<tool_call>";
const TOOL_CLOSE: &str = "</tool_call>";
const THINKING_OPEN: &str = "<thinking>";
const THINKING_CLOSE: &str = "</thinking>";

/// A validated tool invocation, consumed exactly once by the executor
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub name: ToolName,
    /// Parameter object from the wire format; keys are unique by JSON rules
    pub parameters: Map<String, Value>,
    /// Free-text justification the model gave for this call
    pub reasoning: String,
}

impl ToolCall {
    /// Get a trimmed, non-empty string parameter
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.parameters
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    }

    /// Get an integer parameter
    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.parameters
            .get(key)
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
    }
}

/// Outcome of scanning a model response for a tool call
#[derive(Debug)]
pub enum ParseOutcome {
    /// No tagged block present; the model ignored the protocol
    Missing,
    /// A tagged block is present but unusable; recoverable with a retry
    Malformed(String),
    /// A validated tool call
    Parsed(ToolCall),
}

/// Raw wire shape inside the tagged block
#[derive(Debug, Deserialize)]
struct WireCall {
    tool: String,
    #[serde(default)]
    parameters: Value,
    #[serde(default)]
    reasoning: String,
}

fn extract_block<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = text[start..].find(close)? + start;
    Some(&text[start..end])
}

/// Locate and validate the tool-call block in a model response.
///
/// Unknown tool names and missing required parameters are malformed, not
/// missing: the block was there, the model just got it wrong, and the loop's
/// bounded retry applies.
pub fn parse_tool_call(response: &str) -> ParseOutcome {
    let Some(block) = extract_block(response, TOOL_OPEN, TOOL_CLOSE) else {
        return ParseOutcome::Missing;
    };

    let wire: WireCall = match serde_json::from_str(block.trim()) {
        Ok(w) => w,
        Err(e) => return ParseOutcome::Malformed(format!("invalid JSON in tool call: {}", e)),
    };

    let name: ToolName = match wire.tool.parse() {
        Ok(n) => n,
        Err(e) => return ParseOutcome::Malformed(e),
    };

    let parameters = match wire.parameters {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return ParseOutcome::Malformed(format!(
                "'parameters' must be an object, got {}",
                type_name(&other)
            ))
        }
    };

    let definition = definition_for(name);
    for required in definition.required_parameters() {
        let present = parameters
            .get(required)
            .map(|v| match v {
                Value::String(s) => !s.trim().is_empty(),
                Value::Null => false,
                _ => true,
            })
            .unwrap_or(false);
        if !present {
            return ParseOutcome::Malformed(format!(
                "tool '{}' requires parameter '{}'",
                name, required
            ));
        }
    }

    ParseOutcome::Parsed(ToolCall {
        name,
        parameters,
        reasoning: wire.reasoning.trim().to_string(),
    })
}

/// Extract the free-text reasoning block, if any. Absence is not an error.
pub fn parse_thinking(response: &str) -> Option<String> {
    extract_block(response, THINKING_OPEN, THINKING_CLOSE)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
