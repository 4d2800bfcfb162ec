//! Persistence seam for goals, plan steps, sub-tasks and agent records.
//!
//! A [`Store`] is bound to one caller identity (the owner). Every read and
//! write is scoped to rows reachable from that owner's goals; rows owned by
//! someone else look exactly like rows that do not exist.
//!
//! ```text
//! user_goals --< task_plans --< sub_tasks
//!                    |
//!                    +--< {research,execution,deployment}_requests --< *_results
//! ```
//!
//! Writes are independent calls. A batch of inserts that fails half way
//! leaves the earlier rows in place.

pub mod memory;
pub mod postgres;

pub use memory::{MemoryStore, StoreOp};
pub use postgres::PgStore;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use waypoint_db::models::{RequestStatus, StepStatus, SubTask, TaskPlan, UserGoal};
use waypoint_db::queries::plans::NewTaskPlan;
use waypoint_db::queries::sub_tasks::NewSubTask;

use crate::agent::{AgentDomain, AgentRequest, AgentResult, RequestInput, ResultPayload};

/// Owner-scoped persistence operations.
#[async_trait]
pub trait Store: Send + Sync {
    /// The caller identity every operation is scoped to.
    fn owner(&self) -> Uuid;

    async fn insert_goal(&self, goal_text: &str) -> Result<UserGoal>;
    async fn get_goal(&self, id: Uuid) -> Result<Option<UserGoal>>;
    /// Newest first.
    async fn list_goals(&self) -> Result<Vec<UserGoal>>;

    async fn insert_plan(&self, goal_id: Uuid, new: &NewTaskPlan) -> Result<TaskPlan>;
    async fn get_plan(&self, id: Uuid) -> Result<Option<TaskPlan>>;
    /// Ordered by position.
    async fn list_plans_for_goal(&self, goal_id: Uuid) -> Result<Vec<TaskPlan>>;
    async fn update_plan_status(&self, id: Uuid, status: StepStatus) -> Result<()>;

    async fn insert_sub_task(&self, plan_id: Uuid, new: &NewSubTask) -> Result<SubTask>;
    /// Ordered by position.
    async fn list_sub_tasks(&self, plan_id: Uuid) -> Result<Vec<SubTask>>;
    /// Flip the completed flag and return the new value.
    async fn toggle_sub_task(&self, id: Uuid) -> Result<bool>;

    /// Create an agent request in `in_progress`.
    async fn insert_request(&self, plan_id: Uuid, input: &RequestInput) -> Result<AgentRequest>;
    async fn update_request_status(
        &self,
        domain: AgentDomain,
        id: Uuid,
        status: RequestStatus,
    ) -> Result<()>;
    /// Oldest first.
    async fn list_requests(&self, plan_id: Uuid, domain: AgentDomain)
    -> Result<Vec<AgentRequest>>;

    async fn insert_result(&self, request_id: Uuid, payload: &ResultPayload)
    -> Result<AgentResult>;
    /// Oldest first.
    async fn list_results(&self, domain: AgentDomain, request_id: Uuid)
    -> Result<Vec<AgentResult>>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn Store) {}
};
