use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Priority of a plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = PriorityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(PriorityParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Priority`] string.
#[derive(Debug, Clone)]
pub struct PriorityParseError(pub String);

impl fmt::Display for PriorityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid priority: {:?}", self.0)
    }
}

impl std::error::Error for PriorityParseError {}

// ---------------------------------------------------------------------------

/// Status of a plan step. Only ever changed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for StepStatus {
    type Err = StepStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(StepStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`StepStatus`] string.
#[derive(Debug, Clone)]
pub struct StepStatusParseError(pub String);

impl fmt::Display for StepStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid step status: {:?}", self.0)
    }
}

impl std::error::Error for StepStatusParseError {}

// ---------------------------------------------------------------------------

/// Status of an agent request (research, execution or deployment).
///
/// `Pending` is part of the schema but requests are created directly in
/// `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl RequestStatus {
    /// `true` for `completed` and `failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for RequestStatus {
    type Err = RequestStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(RequestStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`RequestStatus`] string.
#[derive(Debug, Clone)]
pub struct RequestStatusParseError(pub String);

impl fmt::Display for RequestStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid request status: {:?}", self.0)
    }
}

impl std::error::Error for RequestStatusParseError {}

// ---------------------------------------------------------------------------

/// Kind of work requested from the execution agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    CodeGeneration,
    ScriptExecution,
    ApiCall,
    FileCreation,
}

impl fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CodeGeneration => "code_generation",
            Self::ScriptExecution => "script_execution",
            Self::ApiCall => "api_call",
            Self::FileCreation => "file_creation",
        };
        f.write_str(s)
    }
}

impl FromStr for ExecutionType {
    type Err = ExecutionTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code_generation" => Ok(Self::CodeGeneration),
            "script_execution" => Ok(Self::ScriptExecution),
            "api_call" => Ok(Self::ApiCall),
            "file_creation" => Ok(Self::FileCreation),
            other => Err(ExecutionTypeParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ExecutionType`] string.
#[derive(Debug, Clone)]
pub struct ExecutionTypeParseError(pub String);

impl fmt::Display for ExecutionTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid execution type: {:?}", self.0)
    }
}

impl std::error::Error for ExecutionTypeParseError {}

// ---------------------------------------------------------------------------

/// Hosting provider targeted by a deployment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeploymentProvider {
    Vercel,
    Netlify,
    GithubPages,
}

impl DeploymentProvider {
    /// Human-readable provider name used in build logs.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Vercel => "Vercel",
            Self::Netlify => "Netlify",
            Self::GithubPages => "GitHub Pages",
        }
    }

    /// Host suffix for simulated deployment URLs.
    pub fn host_suffix(self) -> &'static str {
        match self {
            Self::Vercel => "vercel.app",
            Self::Netlify => "netlify.app",
            Self::GithubPages => "github.io",
        }
    }
}

impl fmt::Display for DeploymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Vercel => "vercel",
            Self::Netlify => "netlify",
            Self::GithubPages => "github_pages",
        };
        f.write_str(s)
    }
}

impl FromStr for DeploymentProvider {
    type Err = DeploymentProviderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vercel" => Ok(Self::Vercel),
            "netlify" => Ok(Self::Netlify),
            "github_pages" => Ok(Self::GithubPages),
            other => Err(DeploymentProviderParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`DeploymentProvider`] string.
#[derive(Debug, Clone)]
pub struct DeploymentProviderParseError(pub String);

impl fmt::Display for DeploymentProviderParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid deployment provider: {:?}", self.0)
    }
}

impl std::error::Error for DeploymentProviderParseError {}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A free-text goal owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserGoal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub goal_text: String,
    pub created_at: DateTime<Utc>,
}

/// One ordered step of a goal's plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskPlan {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub title: String,
    pub description: String,
    pub position: i32,
    pub estimated_duration: String,
    pub priority: Priority,
    pub status: StepStatus,
    pub created_at: DateTime<Utc>,
}

/// A checklist item belonging to one plan step.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubTask {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub title: String,
    pub description: String,
    pub position: i32,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResearchRequest {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub query: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResearchResult {
    pub id: Uuid,
    pub request_id: Uuid,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub relevance_score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionRequest {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub execution_type: ExecutionType,
    pub instructions: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionResult {
    pub id: Uuid,
    pub request_id: Uuid,
    pub output_type: String,
    pub content: String,
    pub file_path: Option<String>,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeploymentRequest {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub deployment_type: DeploymentProvider,
    pub configuration: serde_json::Value,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeploymentResult {
    pub id: Uuid,
    pub request_id: Uuid,
    pub deployment_url: Option<String>,
    pub claim_url: Option<String>,
    pub success: bool,
    pub logs: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
