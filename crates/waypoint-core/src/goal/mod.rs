//! Goal expansion: free text in, stored plan steps and sub-tasks out.

use serde::Serialize;
use uuid::Uuid;

use waypoint_db::models::{SubTask, TaskPlan, UserGoal};

use crate::store::Store;
use crate::templates::{select_plan_template, select_subtask_template};

#[derive(Debug, thiserror::Error)]
pub enum GoalError {
    #[error("goal text must not be empty")]
    EmptyGoal,

    #[error("goal {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// A stored plan step with its checklist.
#[derive(Debug, Clone, Serialize)]
pub struct PlanStep {
    pub plan: TaskPlan,
    pub sub_tasks: Vec<SubTask>,
}

impl PlanStep {
    /// `(completed, total)` sub-task counts.
    pub fn progress(&self) -> (usize, usize) {
        let done = self.sub_tasks.iter().filter(|s| s.completed).count();
        (done, self.sub_tasks.len())
    }
}

/// A goal and its whole plan tree.
#[derive(Debug, Clone, Serialize)]
pub struct ExpandedGoal {
    pub goal: UserGoal,
    pub steps: Vec<PlanStep>,
}

impl ExpandedGoal {
    /// Plan step rows in position order.
    pub fn plans(&self) -> Vec<TaskPlan> {
        self.steps.iter().map(|s| s.plan.clone()).collect()
    }

    /// `(completed, total)` sub-task counts across every step.
    pub fn progress(&self) -> (usize, usize) {
        self.steps.iter().fold((0, 0), |(done, total), step| {
            let (d, t) = step.progress();
            (done + d, total + t)
        })
    }
}

/// Store `goal_text` and expand it into five plan steps with their
/// sub-tasks.
///
/// Inserts run one at a time and are not atomic: if one fails, the rows
/// written before it stay.
pub async fn expand_goal(store: &dyn Store, goal_text: &str) -> Result<ExpandedGoal, GoalError> {
    if goal_text.trim().is_empty() {
        return Err(GoalError::EmptyGoal);
    }

    let goal = store.insert_goal(goal_text).await?;
    let drafts = select_plan_template(goal_text);
    let mut steps = Vec::with_capacity(drafts.len());

    for (position, draft) in (0i32..).zip(&drafts) {
        let plan = store.insert_plan(goal.id, &draft.to_new(position)).await?;

        let mut sub_tasks = Vec::new();
        for (sub_position, sub_draft) in (0i32..).zip(select_subtask_template(&plan.title)) {
            let sub_task = store
                .insert_sub_task(plan.id, &sub_draft.to_new(sub_position))
                .await?;
            sub_tasks.push(sub_task);
        }

        steps.push(PlanStep { plan, sub_tasks });
    }

    tracing::info!(
        goal_id = %goal.id,
        steps = steps.len(),
        "expanded goal into plan"
    );

    Ok(ExpandedGoal { goal, steps })
}

/// Read a goal and its plan tree back from the store.
pub async fn load_goal(store: &dyn Store, goal_id: Uuid) -> Result<ExpandedGoal, GoalError> {
    let goal = store
        .get_goal(goal_id)
        .await?
        .ok_or(GoalError::NotFound(goal_id))?;

    let mut steps = Vec::new();
    for plan in store.list_plans_for_goal(goal_id).await? {
        let sub_tasks = store.list_sub_tasks(plan.id).await?;
        steps.push(PlanStep { plan, sub_tasks });
    }

    Ok(ExpandedGoal { goal, steps })
}
