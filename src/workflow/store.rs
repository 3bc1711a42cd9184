//! Prompt storage
//!
//! The orchestrator resolves projects, features, and artifact texts through
//! [`PromptStore`]; production deployments back it with their own database,
//! and the in-memory implementation here serves the CLI and tests.
//!
//! Write semantics differ per artifact kind: implementation prompts are
//! versioned (a save appends a new version and the latest one is current),
//! review prompts are overwritten in place.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::{ArtifactKind, FeatureContext, ProjectContext, Result, RubricError};

/// Resolution and persistence boundary for prompt artifacts
#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Resolve a project's metadata
    async fn project(&self, project_id: &str) -> Result<ProjectContext>;

    /// Resolve one feature of a project
    async fn feature(&self, project_id: &str, feature_id: &str) -> Result<FeatureContext>;

    /// Features sharing the target feature's module, excluding the target
    async fn siblings(&self, project_id: &str, feature_id: &str) -> Result<Vec<FeatureContext>>;

    /// Current text of one artifact of a feature
    async fn artifact(
        &self,
        project_id: &str,
        feature_id: &str,
        kind: ArtifactKind,
    ) -> Result<String>;

    /// Persist an updated artifact text, honoring the kind's write semantics
    async fn save_artifact(
        &self,
        project_id: &str,
        feature_id: &str,
        kind: ArtifactKind,
        text: &str,
    ) -> Result<()>;
}

/// One feature and its two artifact texts
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub feature: FeatureContext,
    /// Implementation prompt versions, oldest first; the last one is current
    pub implementation_versions: Vec<String>,
    /// Review prompt, overwritten on save
    pub review_prompt: String,
}

#[derive(Debug, Clone)]
struct ProjectRecord {
    context: ProjectContext,
    features: Vec<FeatureRecord>,
}

/// In-memory prompt store for the CLI and tests
#[derive(Default)]
pub struct InMemoryPromptStore {
    projects: Mutex<HashMap<String, ProjectRecord>>,
}

impl InMemoryPromptStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a project and its features
    pub fn insert_project(&self, context: ProjectContext, features: Vec<FeatureRecord>) {
        if let Ok(mut projects) = self.projects.lock() {
            projects.insert(context.id.clone(), ProjectRecord { context, features });
        }
    }

    /// Number of stored implementation versions for a feature
    pub fn version_count(&self, project_id: &str, feature_id: &str) -> usize {
        self.projects
            .lock()
            .ok()
            .and_then(|p| {
                p.get(project_id).and_then(|r| {
                    r.features
                        .iter()
                        .find(|f| f.feature.id == feature_id)
                        .map(|f| f.implementation_versions.len())
                })
            })
            .unwrap_or(0)
    }

    fn with_feature<T>(
        &self,
        project_id: &str,
        feature_id: &str,
        f: impl FnOnce(&mut FeatureRecord) -> Result<T>,
    ) -> Result<T> {
        let mut projects = self
            .projects
            .lock()
            .map_err(|_| RubricError::other("prompt store lock poisoned"))?;
        let record = projects
            .get_mut(project_id)
            .ok_or_else(|| RubricError::not_found(format!("project '{}'", project_id)))?;
        let feature = record
            .features
            .iter_mut()
            .find(|r| r.feature.id == feature_id)
            .ok_or_else(|| {
                RubricError::not_found(format!(
                    "feature '{}' in project '{}'",
                    feature_id, project_id
                ))
            })?;
        f(feature)
    }
}

#[async_trait]
impl PromptStore for InMemoryPromptStore {
    async fn project(&self, project_id: &str) -> Result<ProjectContext> {
        self.projects
            .lock()
            .map_err(|_| RubricError::other("prompt store lock poisoned"))?
            .get(project_id)
            .map(|r| r.context.clone())
            .ok_or_else(|| RubricError::not_found(format!("project '{}'", project_id)))
    }

    async fn feature(&self, project_id: &str, feature_id: &str) -> Result<FeatureContext> {
        self.with_feature(project_id, feature_id, |r| Ok(r.feature.clone()))
    }

    async fn siblings(&self, project_id: &str, feature_id: &str) -> Result<Vec<FeatureContext>> {
        let target = self.feature(project_id, feature_id).await?;
        let projects = self
            .projects
            .lock()
            .map_err(|_| RubricError::other("prompt store lock poisoned"))?;
        let record = projects
            .get(project_id)
            .ok_or_else(|| RubricError::not_found(format!("project '{}'", project_id)))?;
        Ok(record
            .features
            .iter()
            .filter(|r| r.feature.module == target.module && r.feature.id != target.id)
            .map(|r| r.feature.clone())
            .collect())
    }

    async fn artifact(
        &self,
        project_id: &str,
        feature_id: &str,
        kind: ArtifactKind,
    ) -> Result<String> {
        self.with_feature(project_id, feature_id, |r| match kind {
            ArtifactKind::Implementation => Ok(r
                .implementation_versions
                .last()
                .cloned()
                .unwrap_or_default()),
            ArtifactKind::Review => Ok(r.review_prompt.clone()),
        })
    }

    async fn save_artifact(
        &self,
        project_id: &str,
        feature_id: &str,
        kind: ArtifactKind,
        text: &str,
    ) -> Result<()> {
        self.with_feature(project_id, feature_id, |r| {
            match kind {
                ArtifactKind::Implementation => {
                    r.implementation_versions.push(text.to_string());
                }
                ArtifactKind::Review => {
                    r.review_prompt = text.to_string();
                }
            }
            Ok(())
        })
    }
}
