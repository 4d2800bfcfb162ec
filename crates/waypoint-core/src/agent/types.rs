//! Domain types shared by the three simulated agents.
//!
//! The database keeps one request table and one result table per agent.
//! These types fold each triple into a single tagged enum so the recorder
//! and the store can treat the domains uniformly.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use waypoint_db::models::{
    DeploymentProvider, DeploymentRequest, DeploymentResult, ExecutionRequest, ExecutionResult,
    ExecutionType, RequestStatus, ResearchRequest, ResearchResult,
};
use waypoint_db::queries::deployment::NewDeploymentResult;
use waypoint_db::queries::execution::NewExecutionResult;
use waypoint_db::queries::research::NewResearchResult;

/// One of the three simulated agents. Also names a workflow phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentDomain {
    Research,
    Execution,
    Deployment,
}

impl AgentDomain {
    /// All domains in workflow order.
    pub const ALL: [AgentDomain; 3] = [Self::Research, Self::Execution, Self::Deployment];
}

impl fmt::Display for AgentDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Research => "research",
            Self::Execution => "execution",
            Self::Deployment => "deployment",
        };
        f.write_str(s)
    }
}

/// Domain-specific input of an agent request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum RequestInput {
    Research {
        query: String,
    },
    Execution {
        execution_type: ExecutionType,
        instructions: String,
    },
    Deployment {
        provider: DeploymentProvider,
        configuration: Value,
    },
}

impl RequestInput {
    pub fn domain(&self) -> AgentDomain {
        match self {
            Self::Research { .. } => AgentDomain::Research,
            Self::Execution { .. } => AgentDomain::Execution,
            Self::Deployment { .. } => AgentDomain::Deployment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchFinding {
    pub title: String,
    pub content: String,
    pub summary: String,
    /// In `[0, 1]`.
    pub relevance_score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    /// `code`, `script_output`, `api_response`, `file` or `error`.
    pub output_type: String,
    pub content: String,
    pub file_path: Option<String>,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    pub deployment_url: Option<String>,
    pub claim_url: Option<String>,
    pub success: bool,
    pub logs: String,
}

/// Domain-specific payload of one agent result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum ResultPayload {
    Research(ResearchFinding),
    Execution(ExecutionOutput),
    Deployment(DeploymentOutcome),
}

impl ResultPayload {
    pub fn domain(&self) -> AgentDomain {
        match self {
            Self::Research(_) => AgentDomain::Research,
            Self::Execution(_) => AgentDomain::Execution,
            Self::Deployment(_) => AgentDomain::Deployment,
        }
    }

    /// The failure row written when content generation fails.
    pub fn failure(domain: AgentDomain, message: &str) -> Self {
        match domain {
            AgentDomain::Research => Self::Research(ResearchFinding {
                title: "Research failed".to_owned(),
                content: message.to_owned(),
                summary: "Research could not be completed.".to_owned(),
                relevance_score: 0.0,
            }),
            AgentDomain::Execution => Self::Execution(ExecutionOutput {
                output_type: "error".to_owned(),
                content: message.to_owned(),
                file_path: None,
                success: false,
            }),
            AgentDomain::Deployment => Self::Deployment(DeploymentOutcome {
                deployment_url: None,
                claim_url: None,
                success: false,
                logs: format!("Deployment failed: {message}"),
            }),
        }
    }

    /// `false` only for failure rows. Research findings have no success flag.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Research(finding) => finding.relevance_score > 0.0,
            Self::Execution(output) => output.success,
            Self::Deployment(outcome) => outcome.success,
        }
    }
}

impl From<&ResearchFinding> for NewResearchResult {
    fn from(f: &ResearchFinding) -> Self {
        Self {
            title: f.title.clone(),
            content: f.content.clone(),
            summary: f.summary.clone(),
            relevance_score: f.relevance_score,
        }
    }
}

impl From<&ExecutionOutput> for NewExecutionResult {
    fn from(o: &ExecutionOutput) -> Self {
        Self {
            output_type: o.output_type.clone(),
            content: o.content.clone(),
            file_path: o.file_path.clone(),
            success: o.success,
        }
    }
}

impl From<&DeploymentOutcome> for NewDeploymentResult {
    fn from(o: &DeploymentOutcome) -> Self {
        Self {
            deployment_url: o.deployment_url.clone(),
            claim_url: o.claim_url.clone(),
            success: o.success,
            logs: o.logs.clone(),
        }
    }
}

/// A stored agent request, whatever its domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub input: RequestInput,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AgentRequest {
    pub fn domain(&self) -> AgentDomain {
        self.input.domain()
    }
}

impl From<ResearchRequest> for AgentRequest {
    fn from(r: ResearchRequest) -> Self {
        Self {
            id: r.id,
            plan_id: r.plan_id,
            input: RequestInput::Research { query: r.query },
            status: r.status,
            created_at: r.created_at,
            completed_at: r.completed_at,
        }
    }
}

impl From<ExecutionRequest> for AgentRequest {
    fn from(r: ExecutionRequest) -> Self {
        Self {
            id: r.id,
            plan_id: r.plan_id,
            input: RequestInput::Execution {
                execution_type: r.execution_type,
                instructions: r.instructions,
            },
            status: r.status,
            created_at: r.created_at,
            completed_at: r.completed_at,
        }
    }
}

impl From<DeploymentRequest> for AgentRequest {
    fn from(r: DeploymentRequest) -> Self {
        Self {
            id: r.id,
            plan_id: r.plan_id,
            input: RequestInput::Deployment {
                provider: r.deployment_type,
                configuration: r.configuration,
            },
            status: r.status,
            created_at: r.created_at,
            completed_at: r.completed_at,
        }
    }
}

/// A stored agent result, whatever its domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub id: Uuid,
    pub request_id: Uuid,
    pub payload: ResultPayload,
    pub created_at: DateTime<Utc>,
}

impl From<ResearchResult> for AgentResult {
    fn from(r: ResearchResult) -> Self {
        Self {
            id: r.id,
            request_id: r.request_id,
            payload: ResultPayload::Research(ResearchFinding {
                title: r.title,
                content: r.content,
                summary: r.summary,
                relevance_score: r.relevance_score,
            }),
            created_at: r.created_at,
        }
    }
}

impl From<ExecutionResult> for AgentResult {
    fn from(r: ExecutionResult) -> Self {
        Self {
            id: r.id,
            request_id: r.request_id,
            payload: ResultPayload::Execution(ExecutionOutput {
                output_type: r.output_type,
                content: r.content,
                file_path: r.file_path,
                success: r.success,
            }),
            created_at: r.created_at,
        }
    }
}

impl From<DeploymentResult> for AgentResult {
    fn from(r: DeploymentResult) -> Self {
        Self {
            id: r.id,
            request_id: r.request_id,
            payload: ResultPayload::Deployment(DeploymentOutcome {
                deployment_url: r.deployment_url,
                claim_url: r.claim_url,
                success: r.success,
                logs: r.logs,
            }),
            created_at: r.created_at,
        }
    }
}
