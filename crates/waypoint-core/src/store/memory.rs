//! In-memory [`Store`] used by the `demo` command and by tests.
//!
//! Mirrors the Postgres store's ownership rules and error messages. With the
//! `test-util` feature, faults can be injected per operation to exercise
//! failure paths.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use waypoint_db::models::{RequestStatus, StepStatus, SubTask, TaskPlan, UserGoal};
use waypoint_db::queries::plans::NewTaskPlan;
use waypoint_db::queries::sub_tasks::NewSubTask;

use super::Store;
use crate::agent::{AgentDomain, AgentRequest, AgentResult, RequestInput, ResultPayload};

/// A store operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    InsertGoal,
    InsertPlan,
    InsertSubTask,
    UpdatePlanStatus,
    ToggleSubTask,
    InsertRequest,
    UpdateRequestStatus,
    InsertResult,
}

#[derive(Debug, Default)]
struct State {
    goals: Vec<UserGoal>,
    plans: Vec<TaskPlan>,
    sub_tasks: Vec<SubTask>,
    requests: Vec<AgentRequest>,
    results: Vec<AgentResult>,
    /// Successes left before the operation starts failing.
    faults: HashMap<StoreOp, u32>,
}

impl State {
    fn check(&mut self, op: StoreOp) -> Result<()> {
        if let Some(remaining) = self.faults.get_mut(&op) {
            if *remaining == 0 {
                bail!("injected failure for {op:?}");
            }
            *remaining -= 1;
        }
        Ok(())
    }

    fn owns_goal(&self, owner: Uuid, goal_id: Uuid) -> bool {
        self.goals
            .iter()
            .any(|g| g.id == goal_id && g.user_id == owner)
    }

    fn owns_plan(&self, owner: Uuid, plan_id: Uuid) -> bool {
        self.plans
            .iter()
            .find(|p| p.id == plan_id)
            .is_some_and(|p| self.owns_goal(owner, p.goal_id))
    }

    fn owned_request(&self, owner: Uuid, request_id: Uuid) -> Option<&AgentRequest> {
        self.requests
            .iter()
            .find(|r| r.id == request_id)
            .filter(|r| self.owns_plan(owner, r.plan_id))
    }
}

/// Shared in-memory tables.
///
/// Clones and [`for_owner`](Self::for_owner) views share the same tables.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    owner: Uuid,
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new(owner: Uuid) -> Self {
        Self {
            owner,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// A view of the same tables as a different caller.
    pub fn for_owner(&self, owner: Uuid) -> Self {
        Self {
            owner,
            state: Arc::clone(&self.state),
        }
    }

}

#[cfg(any(test, feature = "test-util"))]
impl MemoryStore {
    /// Make every future `op` fail.
    pub async fn fail_on(&self, op: StoreOp) {
        self.fail_after(op, 0).await;
    }

    /// Let `op` succeed `successes` more times, then fail.
    pub async fn fail_after(&self, op: StoreOp, successes: u32) {
        self.state.lock().await.faults.insert(op, successes);
    }

    pub async fn clear_faults(&self) {
        self.state.lock().await.faults.clear();
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn owner(&self) -> Uuid {
        self.owner
    }

    async fn insert_goal(&self, goal_text: &str) -> Result<UserGoal> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::InsertGoal)?;
        if goal_text.trim().is_empty() {
            bail!("goal text must not be empty");
        }
        let goal = UserGoal {
            id: Uuid::new_v4(),
            user_id: self.owner,
            goal_text: goal_text.to_owned(),
            created_at: Utc::now(),
        };
        state.goals.push(goal.clone());
        Ok(goal)
    }

    async fn get_goal(&self, id: Uuid) -> Result<Option<UserGoal>> {
        let state = self.state.lock().await;
        Ok(state
            .goals
            .iter()
            .find(|g| g.id == id && g.user_id == self.owner)
            .cloned())
    }

    async fn list_goals(&self) -> Result<Vec<UserGoal>> {
        let state = self.state.lock().await;
        Ok(state
            .goals
            .iter()
            .rev()
            .filter(|g| g.user_id == self.owner)
            .cloned()
            .collect())
    }

    async fn insert_plan(&self, goal_id: Uuid, new: &NewTaskPlan) -> Result<TaskPlan> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::InsertPlan)?;
        if !state.owns_goal(self.owner, goal_id) {
            bail!("goal {goal_id} not found");
        }
        if state
            .plans
            .iter()
            .any(|p| p.goal_id == goal_id && p.position == new.position)
        {
            bail!("goal {goal_id} already has a step at position {}", new.position);
        }
        let plan = TaskPlan {
            id: Uuid::new_v4(),
            goal_id,
            title: new.title.clone(),
            description: new.description.clone(),
            position: new.position,
            estimated_duration: new.estimated_duration.clone(),
            priority: new.priority,
            status: StepStatus::Pending,
            created_at: Utc::now(),
        };
        state.plans.push(plan.clone());
        Ok(plan)
    }

    async fn get_plan(&self, id: Uuid) -> Result<Option<TaskPlan>> {
        let state = self.state.lock().await;
        if !state.owns_plan(self.owner, id) {
            return Ok(None);
        }
        Ok(state.plans.iter().find(|p| p.id == id).cloned())
    }

    async fn list_plans_for_goal(&self, goal_id: Uuid) -> Result<Vec<TaskPlan>> {
        let state = self.state.lock().await;
        if !state.owns_goal(self.owner, goal_id) {
            return Ok(Vec::new());
        }
        let mut plans: Vec<TaskPlan> = state
            .plans
            .iter()
            .filter(|p| p.goal_id == goal_id)
            .cloned()
            .collect();
        plans.sort_by_key(|p| p.position);
        Ok(plans)
    }

    async fn update_plan_status(&self, id: Uuid, status: StepStatus) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::UpdatePlanStatus)?;
        if !state.owns_plan(self.owner, id) {
            bail!("plan step {id} not found");
        }
        let plan = state
            .plans
            .iter_mut()
            .find(|p| p.id == id)
            .with_context(|| format!("plan step {id} not found"))?;
        plan.status = status;
        Ok(())
    }

    async fn insert_sub_task(&self, plan_id: Uuid, new: &NewSubTask) -> Result<SubTask> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::InsertSubTask)?;
        if !state.owns_plan(self.owner, plan_id) {
            bail!("plan step {plan_id} not found");
        }
        let sub_task = SubTask {
            id: Uuid::new_v4(),
            plan_id,
            title: new.title.clone(),
            description: new.description.clone(),
            position: new.position,
            completed: false,
            created_at: Utc::now(),
        };
        state.sub_tasks.push(sub_task.clone());
        Ok(sub_task)
    }

    async fn list_sub_tasks(&self, plan_id: Uuid) -> Result<Vec<SubTask>> {
        let state = self.state.lock().await;
        if !state.owns_plan(self.owner, plan_id) {
            return Ok(Vec::new());
        }
        let mut sub_tasks: Vec<SubTask> = state
            .sub_tasks
            .iter()
            .filter(|s| s.plan_id == plan_id)
            .cloned()
            .collect();
        sub_tasks.sort_by_key(|s| s.position);
        Ok(sub_tasks)
    }

    async fn toggle_sub_task(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::ToggleSubTask)?;
        let plan_id = state
            .sub_tasks
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.plan_id)
            .filter(|plan_id| state.owns_plan(self.owner, *plan_id))
            .with_context(|| format!("sub-task {id} not found"))?;
        let sub_task = state
            .sub_tasks
            .iter_mut()
            .find(|s| s.id == id && s.plan_id == plan_id)
            .with_context(|| format!("sub-task {id} not found"))?;
        sub_task.completed = !sub_task.completed;
        Ok(sub_task.completed)
    }

    async fn insert_request(&self, plan_id: Uuid, input: &RequestInput) -> Result<AgentRequest> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::InsertRequest)?;
        if !state.owns_plan(self.owner, plan_id) {
            bail!("plan step {plan_id} not found");
        }
        let request = AgentRequest {
            id: Uuid::new_v4(),
            plan_id,
            input: input.clone(),
            status: RequestStatus::InProgress,
            created_at: Utc::now(),
            completed_at: None,
        };
        state.requests.push(request.clone());
        Ok(request)
    }

    async fn update_request_status(
        &self,
        domain: AgentDomain,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::UpdateRequestStatus)?;
        let owned = state
            .owned_request(self.owner, id)
            .is_some_and(|r| r.domain() == domain);
        if !owned {
            bail!("{domain} request {id} not found");
        }
        let request = state
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .with_context(|| format!("{domain} request {id} not found"))?;
        request.status = status;
        if status.is_terminal() {
            request.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_requests(
        &self,
        plan_id: Uuid,
        domain: AgentDomain,
    ) -> Result<Vec<AgentRequest>> {
        let state = self.state.lock().await;
        if !state.owns_plan(self.owner, plan_id) {
            return Ok(Vec::new());
        }
        Ok(state
            .requests
            .iter()
            .filter(|r| r.plan_id == plan_id && r.domain() == domain)
            .cloned()
            .collect())
    }

    async fn insert_result(
        &self,
        request_id: Uuid,
        payload: &ResultPayload,
    ) -> Result<AgentResult> {
        let mut state = self.state.lock().await;
        state.check(StoreOp::InsertResult)?;
        let domain = payload.domain();
        let owned = state
            .owned_request(self.owner, request_id)
            .is_some_and(|r| r.domain() == domain);
        if !owned {
            bail!("{domain} request {request_id} not found");
        }
        if let ResultPayload::Research(finding) = payload {
            if !(0.0..=1.0).contains(&finding.relevance_score) {
                bail!(
                    "relevance score {} is outside [0, 1]",
                    finding.relevance_score
                );
            }
        }
        let result = AgentResult {
            id: Uuid::new_v4(),
            request_id,
            payload: payload.clone(),
            created_at: Utc::now(),
        };
        state.results.push(result.clone());
        Ok(result)
    }

    async fn list_results(
        &self,
        domain: AgentDomain,
        request_id: Uuid,
    ) -> Result<Vec<AgentResult>> {
        let state = self.state.lock().await;
        let owned = state
            .owned_request(self.owner, request_id)
            .is_some_and(|r| r.domain() == domain);
        if !owned {
            return Ok(Vec::new());
        }
        Ok(state
            .results
            .iter()
            .filter(|r| r.request_id == request_id)
            .cloned()
            .collect())
    }
}
