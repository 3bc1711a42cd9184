//! Configuration management for rubric
//!
//! Supports environment variables, config files, and runtime overrides.
//! Dimension tables are data, not code: both artifact kinds carry an ordered
//! default list that callers may override per invocation.
//!
//! Config file location: ~/.config/rubric/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::core::error::{Result, RubricError};
use crate::core::types::{ArtifactKind, Dimension};

/// Main configuration for rubric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Model endpoint configuration
    pub model: ModelConfig,
    /// Agent loop bounds and pause timeouts
    pub agent: AgentConfig,
    /// Per-kind quality dimension tables
    #[serde(default)]
    pub dimensions: DimensionTables,
}

/// Model endpoint configuration (Ollama-compatible chat API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Model used for the reasoning loop
    pub name: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard cap on reasoning iterations per session
    /// Default: 50
    pub max_iterations: usize,
    /// Consecutive malformed tool-call responses tolerated before the
    /// iteration counter is forced forward
    /// Default: 3
    pub max_parse_errors: usize,
    /// Sliding-window size over conversation history, in assistant/user
    /// rounds kept after the seed turn
    /// Default: 15
    pub history_rounds: usize,
    /// Bounded wait for a caller resume after each suggestion (review mode)
    /// Default: 300
    pub review_pause_secs: u64,
    /// Bounded wait for caller confirmation of the final plan (plan mode)
    /// Default: 600
    pub plan_pause_secs: u64,
    /// Whether to show debug output
    pub debug: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            max_parse_errors: 3,
            history_rounds: 15,
            review_pause_secs: 300,
            plan_pause_secs: 600,
            debug: env::var("RUBRIC_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            name: env::var("RUBRIC_MODEL").unwrap_or_else(|_| "qwen3:8b".to_string()),
            timeout_secs: 120,
        }
    }
}

/// One row of a dimension table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionEntry {
    pub id: String,
    pub display_name: String,
    pub weight: f32,
}

/// Ordered default dimension lists per artifact kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionTables {
    pub implementation: Vec<DimensionEntry>,
    pub review: Vec<DimensionEntry>,
}

impl Default for DimensionTables {
    fn default() -> Self {
        let entry = |id: &str, name: &str, weight: f32| DimensionEntry {
            id: id.to_string(),
            display_name: name.to_string(),
            weight,
        };
        Self {
            implementation: vec![
                entry("completeness", "Completeness", 0.9),
                entry("interface_clarity", "Interface Clarity", 0.8),
                entry("dependency_accuracy", "Dependency Accuracy", 0.7),
                entry("testability", "Testability", 0.6),
                entry("consistency", "Consistency", 0.5),
            ],
            review: vec![
                entry("coverage", "Review Coverage", 0.9),
                entry("rigor", "Rigor", 0.8),
                entry("actionability", "Actionability", 0.7),
                entry("consistency", "Consistency", 0.5),
            ],
        }
    }
}

impl DimensionTables {
    /// Look up the ordered default table for an artifact kind
    pub fn defaults_for(&self, kind: ArtifactKind) -> Vec<Dimension> {
        let table = match kind {
            ArtifactKind::Implementation => &self.implementation,
            ArtifactKind::Review => &self.review,
        };
        table
            .iter()
            .map(|e| Dimension::new(&e.id, &e.display_name, e.weight))
            .collect()
    }

    /// Resolve a caller-supplied dimension id list against the table.
    ///
    /// Ids not present in the table still resolve: they get a title-cased
    /// display name and a neutral weight, so callers can probe custom axes.
    pub fn resolve(&self, kind: ArtifactKind, requested: Option<&[String]>) -> Vec<Dimension> {
        let defaults = self.defaults_for(kind);
        let Some(ids) = requested else {
            return defaults;
        };
        if ids.is_empty() {
            return defaults;
        }
        ids.iter()
            .map(|id| {
                defaults
                    .iter()
                    .find(|d| d.id == *id)
                    .cloned()
                    .unwrap_or_else(|| Dimension::new(id, title_case(id), 0.5))
            })
            .collect()
    }
}

fn title_case(id: &str) -> String {
    id.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            agent: AgentConfig::default(),
            dimensions: DimensionTables::default(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rubric")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        if let Ok(config) = Self::load_from_file() {
            return config;
        }

        // Fall back to defaults (which respect env vars)
        Self::default()
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(RubricError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| RubricError::config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| RubricError::config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| RubricError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| RubricError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| RubricError::config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Get the full model endpoint URL
    pub fn model_url(&self) -> String {
        format!("http://{}:{}", self.model.host, self.model.port)
    }
}
