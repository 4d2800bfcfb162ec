//! Simulated research, execution and deployment agents.
//!
//! # Architecture
//!
//! ```text
//! WorkflowRunner / CLI
//!     |
//!     v
//! Recorder::record(plan_id, RequestInput)
//!     |
//!     +--> Store::insert_request          (in_progress)
//!     +--> ContentGenerator::generate     (templates + simulated latency)
//!     +--> Store::insert_result  x N      (best effort)
//!     +--> Store::update_request_status   (completed | failed)
//!     |
//!     v
//! AgentRun { request, outcome: Completed | Degraded | Failed }
//! ```

pub mod generator;
pub mod recorder;
pub mod types;

pub use generator::{ContentError, ContentGenerator, LatencyConfig, TemplateGenerator};
pub use recorder::{
    AgentInvocationError, AgentOutcome, AgentRecorder, AgentRun, RecordedResult, Recorder,
};
pub use types::{
    AgentDomain, AgentRequest, AgentResult, DeploymentOutcome, ExecutionOutput, RequestInput,
    ResearchFinding, ResultPayload,
};
