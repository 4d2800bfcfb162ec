//! Content generation seam for the agent recorder.

use std::time::Duration;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;
use waypoint_db::models::DeploymentProvider;

use super::types::{AgentDomain, RequestInput, ResultPayload};
use crate::templates::{
    ResearchDepth, execution_outputs, fallback_findings, research_findings, simulate_deployment,
};

/// Why an agent could not produce content.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("{domain} input is empty")]
    EmptyInput { domain: AgentDomain },

    #[error("deployment configuration has no project_name")]
    MissingProjectName,

    #[error("content generation failed: {0}")]
    Generation(String),
}

/// Produces result payloads for an agent request.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, input: &RequestInput) -> Result<Vec<ResultPayload>, ContentError>;

    /// Alternate content used when [`generate`](Self::generate) fails.
    ///
    /// Only research has a fallback.
    fn fallback(&self, input: &RequestInput) -> Option<Vec<ResultPayload>> {
        match input {
            RequestInput::Research { query } => Some(
                fallback_findings(query)
                    .into_iter()
                    .map(ResultPayload::Research)
                    .collect(),
            ),
            _ => None,
        }
    }
}

const _: () = {
    fn _assert_object_safe(_: &dyn ContentGenerator) {}
};

/// Simulated per-request latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyConfig {
    pub research: Duration,
    pub execution: Duration,
    pub vercel: Duration,
    pub netlify: Duration,
    pub github_pages: Duration,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            research: Duration::from_millis(2000),
            execution: Duration::from_millis(1500),
            vercel: Duration::from_millis(3000),
            netlify: Duration::from_millis(2500),
            github_pages: Duration::from_millis(4000),
        }
    }
}

impl LatencyConfig {
    pub fn zero() -> Self {
        Self {
            research: Duration::ZERO,
            execution: Duration::ZERO,
            vercel: Duration::ZERO,
            netlify: Duration::ZERO,
            github_pages: Duration::ZERO,
        }
    }

    pub fn for_input(&self, input: &RequestInput) -> Duration {
        match input {
            RequestInput::Research { .. } => self.research,
            RequestInput::Execution { .. } => self.execution,
            RequestInput::Deployment { provider, .. } => match provider {
                DeploymentProvider::Vercel => self.vercel,
                DeploymentProvider::Netlify => self.netlify,
                DeploymentProvider::GithubPages => self.github_pages,
            },
        }
    }
}

/// [`ContentGenerator`] backed by the keyword templates.
pub struct TemplateGenerator {
    latency: LatencyConfig,
    rng: Mutex<StdRng>,
}

impl TemplateGenerator {
    pub fn new(latency: LatencyConfig) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic pool choices, for tests and demos.
    pub fn seeded(latency: LatencyConfig, seed: u64) -> Self {
        Self {
            latency,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// No latency.
    pub fn instant() -> Self {
        Self::new(LatencyConfig::zero())
    }
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::new(LatencyConfig::default())
    }
}

#[async_trait]
impl ContentGenerator for TemplateGenerator {
    async fn generate(&self, input: &RequestInput) -> Result<Vec<ResultPayload>, ContentError> {
        let domain = input.domain();

        // Validate before the simulated latency so bad input fails fast.
        let empty = match input {
            RequestInput::Research { query } => query.trim().is_empty(),
            RequestInput::Execution { instructions, .. } => instructions.trim().is_empty(),
            RequestInput::Deployment { configuration, .. } => configuration.is_null(),
        };
        if empty {
            return Err(ContentError::EmptyInput { domain });
        }

        let delay = self.latency.for_input(input);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let payloads = match input {
            RequestInput::Research { query } => {
                research_findings(query, ResearchDepth::detect(query))
                    .into_iter()
                    .map(ResultPayload::Research)
                    .collect()
            }
            RequestInput::Execution {
                execution_type,
                instructions,
            } => {
                let mut rng = self.rng.lock().await;
                execution_outputs(*execution_type, instructions, &mut *rng)
                    .into_iter()
                    .map(ResultPayload::Execution)
                    .collect()
            }
            RequestInput::Deployment {
                provider,
                configuration,
            } => {
                let project_name = configuration
                    .get("project_name")
                    .and_then(Value::as_str)
                    .ok_or(ContentError::MissingProjectName)?;
                vec![ResultPayload::Deployment(simulate_deployment(
                    *provider,
                    project_name,
                    Uuid::new_v4(),
                ))]
            }
        };

        tracing::debug!(%domain, count = payloads.len(), "generated agent content");
        Ok(payloads)
    }
}
