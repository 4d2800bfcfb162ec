//! [`Store`] backed by Postgres through the `waypoint-db` query functions.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use waypoint_db::models::{RequestStatus, StepStatus, SubTask, TaskPlan, UserGoal};
use waypoint_db::queries::plans::NewTaskPlan;
use waypoint_db::queries::sub_tasks::NewSubTask;
use waypoint_db::queries::{deployment, execution, goals, plans, research, sub_tasks};

use super::Store;
use crate::agent::{AgentDomain, AgentRequest, AgentResult, RequestInput, ResultPayload};

/// Postgres store for one owner. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    owner: Uuid,
}

impl PgStore {
    pub fn new(pool: PgPool, owner: Uuid) -> Self {
        Self { pool, owner }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    fn owner(&self) -> Uuid {
        self.owner
    }

    async fn insert_goal(&self, goal_text: &str) -> Result<UserGoal> {
        goals::insert_goal(&self.pool, self.owner, goal_text).await
    }

    async fn get_goal(&self, id: Uuid) -> Result<Option<UserGoal>> {
        goals::get_goal(&self.pool, self.owner, id).await
    }

    async fn list_goals(&self) -> Result<Vec<UserGoal>> {
        goals::list_goals(&self.pool, self.owner).await
    }

    async fn insert_plan(&self, goal_id: Uuid, new: &NewTaskPlan) -> Result<TaskPlan> {
        plans::insert_plan(&self.pool, self.owner, goal_id, new).await
    }

    async fn get_plan(&self, id: Uuid) -> Result<Option<TaskPlan>> {
        plans::get_plan(&self.pool, self.owner, id).await
    }

    async fn list_plans_for_goal(&self, goal_id: Uuid) -> Result<Vec<TaskPlan>> {
        plans::list_plans_for_goal(&self.pool, self.owner, goal_id).await
    }

    async fn update_plan_status(&self, id: Uuid, status: StepStatus) -> Result<()> {
        plans::update_plan_status(&self.pool, self.owner, id, status).await
    }

    async fn insert_sub_task(&self, plan_id: Uuid, new: &NewSubTask) -> Result<SubTask> {
        sub_tasks::insert_sub_task(&self.pool, self.owner, plan_id, new).await
    }

    async fn list_sub_tasks(&self, plan_id: Uuid) -> Result<Vec<SubTask>> {
        sub_tasks::list_sub_tasks_for_plan(&self.pool, self.owner, plan_id).await
    }

    async fn toggle_sub_task(&self, id: Uuid) -> Result<bool> {
        sub_tasks::toggle_sub_task(&self.pool, self.owner, id).await
    }

    async fn insert_request(&self, plan_id: Uuid, input: &RequestInput) -> Result<AgentRequest> {
        let (pool, owner) = (&self.pool, self.owner);
        let status = RequestStatus::InProgress;
        let request: AgentRequest = match input {
            RequestInput::Research { query } => {
                research::insert_research_request(pool, owner, plan_id, query, status)
                    .await?
                    .into()
            }
            RequestInput::Execution {
                execution_type,
                instructions,
            } => execution::insert_execution_request(
                pool,
                owner,
                plan_id,
                *execution_type,
                instructions,
                status,
            )
            .await?
            .into(),
            RequestInput::Deployment {
                provider,
                configuration,
            } => deployment::insert_deployment_request(
                pool,
                owner,
                plan_id,
                *provider,
                configuration,
                status,
            )
            .await?
            .into(),
        };
        Ok(request)
    }

    async fn update_request_status(
        &self,
        domain: AgentDomain,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<()> {
        let (pool, owner) = (&self.pool, self.owner);
        match domain {
            AgentDomain::Research => {
                research::update_research_request_status(pool, owner, id, status).await
            }
            AgentDomain::Execution => {
                execution::update_execution_request_status(pool, owner, id, status).await
            }
            AgentDomain::Deployment => {
                deployment::update_deployment_request_status(pool, owner, id, status).await
            }
        }
    }

    async fn list_requests(
        &self,
        plan_id: Uuid,
        domain: AgentDomain,
    ) -> Result<Vec<AgentRequest>> {
        let (pool, owner) = (&self.pool, self.owner);
        let requests: Vec<AgentRequest> = match domain {
            AgentDomain::Research => research::list_research_requests(pool, owner, plan_id)
                .await?
                .into_iter()
                .map(AgentRequest::from)
                .collect(),
            AgentDomain::Execution => execution::list_execution_requests(pool, owner, plan_id)
                .await?
                .into_iter()
                .map(AgentRequest::from)
                .collect(),
            AgentDomain::Deployment => deployment::list_deployment_requests(pool, owner, plan_id)
                .await?
                .into_iter()
                .map(AgentRequest::from)
                .collect(),
        };
        Ok(requests)
    }

    async fn insert_result(
        &self,
        request_id: Uuid,
        payload: &ResultPayload,
    ) -> Result<AgentResult> {
        let (pool, owner) = (&self.pool, self.owner);
        let result: AgentResult = match payload {
            ResultPayload::Research(finding) => {
                research::insert_research_result(pool, owner, request_id, &finding.into())
                    .await?
                    .into()
            }
            ResultPayload::Execution(output) => {
                execution::insert_execution_result(pool, owner, request_id, &output.into())
                    .await?
                    .into()
            }
            ResultPayload::Deployment(outcome) => {
                deployment::insert_deployment_result(pool, owner, request_id, &outcome.into())
                    .await?
                    .into()
            }
        };
        Ok(result)
    }

    async fn list_results(
        &self,
        domain: AgentDomain,
        request_id: Uuid,
    ) -> Result<Vec<AgentResult>> {
        let (pool, owner) = (&self.pool, self.owner);
        let results: Vec<AgentResult> = match domain {
            AgentDomain::Research => research::list_research_results(pool, owner, request_id)
                .await?
                .into_iter()
                .map(AgentResult::from)
                .collect(),
            AgentDomain::Execution => execution::list_execution_results(pool, owner, request_id)
                .await?
                .into_iter()
                .map(AgentResult::from)
                .collect(),
            AgentDomain::Deployment => {
                deployment::list_deployment_results(pool, owner, request_id)
                    .await?
                    .into_iter()
                    .map(AgentResult::from)
                    .collect()
            }
        };
        Ok(results)
    }
}
