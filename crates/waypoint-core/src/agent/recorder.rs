//! Request/result bookkeeping around one agent invocation.
//!
//! Every invocation follows the same protocol, whatever the domain:
//!
//! 1. Insert the request as `in_progress`. Failure here is the only error
//!    returned to the caller.
//! 2. Ask the [`ContentGenerator`] for payloads.
//! 3. On success, store each payload and mark the request `completed`.
//! 4. On failure, store one failure row, store fallback content when the
//!    domain has any, and mark the request `failed`.
//!
//! Result inserts and the final status update are best effort: failures are
//! logged and the in-memory outcome is still returned.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;
use waypoint_db::models::{DeploymentProvider, ExecutionType, RequestStatus};

use super::generator::{ContentError, ContentGenerator};
use super::types::{AgentDomain, AgentRequest, RequestInput, ResultPayload};
use crate::store::Store;

/// The request row could not be created; nothing else was attempted.
#[derive(Debug, thiserror::Error)]
pub enum AgentInvocationError {
    #[error("failed to create {domain} request for plan step {plan_id}")]
    RequestCreation {
        domain: AgentDomain,
        plan_id: Uuid,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// One payload and the id of its stored row, if storing succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedResult {
    pub id: Option<Uuid>,
    pub payload: ResultPayload,
}

impl RecordedResult {
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// How an invocation ended.
#[derive(Debug)]
pub enum AgentOutcome {
    /// Generation succeeded.
    Completed(Vec<RecordedResult>),
    /// Generation failed and fallback content was produced instead.
    Degraded {
        error: ContentError,
        fallback: Vec<RecordedResult>,
    },
    /// Generation failed and the domain has no fallback.
    Failed { error: ContentError },
}

impl AgentOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Results to show the user, regular or fallback.
    pub fn results(&self) -> &[RecordedResult] {
        match self {
            Self::Completed(results) => results,
            Self::Degraded { fallback, .. } => fallback,
            Self::Failed { .. } => &[],
        }
    }

    /// The request status this outcome maps to.
    pub fn terminal_status(&self) -> RequestStatus {
        match self {
            Self::Completed(_) => RequestStatus::Completed,
            Self::Degraded { .. } | Self::Failed { .. } => RequestStatus::Failed,
        }
    }
}

/// The request as last known and the outcome of one invocation.
#[derive(Debug)]
pub struct AgentRun {
    pub request: AgentRequest,
    pub outcome: AgentOutcome,
}

/// Runs one agent invocation for a plan step.
#[async_trait]
pub trait Recorder: Send + Sync {
    async fn record(
        &self,
        plan_id: Uuid,
        input: RequestInput,
    ) -> Result<AgentRun, AgentInvocationError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn Recorder) {}
};

/// [`Recorder`] that persists through a [`Store`].
#[derive(Clone)]
pub struct AgentRecorder {
    store: Arc<dyn Store>,
    generator: Arc<dyn ContentGenerator>,
}

impl AgentRecorder {
    pub fn new(store: Arc<dyn Store>, generator: Arc<dyn ContentGenerator>) -> Self {
        Self { store, generator }
    }

    pub async fn research(
        &self,
        plan_id: Uuid,
        query: impl Into<String>,
    ) -> Result<AgentRun, AgentInvocationError> {
        let input = RequestInput::Research {
            query: query.into(),
        };
        self.record(plan_id, input).await
    }

    pub async fn execute(
        &self,
        plan_id: Uuid,
        execution_type: ExecutionType,
        instructions: impl Into<String>,
    ) -> Result<AgentRun, AgentInvocationError> {
        let input = RequestInput::Execution {
            execution_type,
            instructions: instructions.into(),
        };
        self.record(plan_id, input).await
    }

    pub async fn deploy(
        &self,
        plan_id: Uuid,
        provider: DeploymentProvider,
        configuration: Value,
    ) -> Result<AgentRun, AgentInvocationError> {
        let input = RequestInput::Deployment {
            provider,
            configuration,
        };
        self.record(plan_id, input).await
    }

    async fn persist(&self, request_id: Uuid, payload: ResultPayload) -> RecordedResult {
        match self.store.insert_result(request_id, &payload).await {
            Ok(row) => RecordedResult {
                id: Some(row.id),
                payload,
            },
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    domain = %payload.domain(),
                    error = %e,
                    "failed to store agent result, keeping it in memory"
                );
                RecordedResult { id: None, payload }
            }
        }
    }

    async fn persist_all(
        &self,
        request_id: Uuid,
        payloads: Vec<ResultPayload>,
    ) -> Vec<RecordedResult> {
        let mut recorded = Vec::with_capacity(payloads.len());
        for payload in payloads {
            recorded.push(self.persist(request_id, payload).await);
        }
        recorded
    }

    async fn finish(&self, request: &mut AgentRequest, status: RequestStatus) {
        let domain = request.domain();
        match self
            .store
            .update_request_status(domain, request.id, status)
            .await
        {
            Ok(()) => {
                request.status = status;
                request.completed_at = Some(Utc::now());
            }
            Err(e) => tracing::error!(
                request_id = %request.id,
                domain = %domain,
                status = %status,
                error = %e,
                "failed to update agent request status"
            ),
        }
    }
}

#[async_trait]
impl Recorder for AgentRecorder {
    async fn record(
        &self,
        plan_id: Uuid,
        input: RequestInput,
    ) -> Result<AgentRun, AgentInvocationError> {
        let domain = input.domain();

        // 1. Request row.
        let mut request = self
            .store
            .insert_request(plan_id, &input)
            .await
            .map_err(|e| AgentInvocationError::RequestCreation {
                domain,
                plan_id,
                source: e.into(),
            })?;
        tracing::info!(
            request_id = %request.id,
            plan_id = %plan_id,
            domain = %domain,
            "agent request started"
        );

        // 2. Content.
        let outcome = match self.generator.generate(&input).await {
            // 3. Success path.
            Ok(payloads) => AgentOutcome::Completed(self.persist_all(request.id, payloads).await),
            // 4. Failure path.
            Err(error) => {
                tracing::warn!(
                    request_id = %request.id,
                    domain = %domain,
                    error = %error,
                    "agent content generation failed"
                );
                let failure = ResultPayload::failure(domain, &error.to_string());
                self.persist(request.id, failure).await;

                match self.generator.fallback(&input) {
                    Some(payloads) => AgentOutcome::Degraded {
                        error,
                        fallback: self.persist_all(request.id, payloads).await,
                    },
                    None => AgentOutcome::Failed { error },
                }
            }
        };

        self.finish(&mut request, outcome.terminal_status()).await;
        tracing::info!(
            request_id = %request.id,
            domain = %domain,
            status = %request.status,
            results = outcome.results().len(),
            "agent request finished"
        );

        Ok(AgentRun { request, outcome })
    }
}
