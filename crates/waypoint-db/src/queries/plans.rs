//! Database query functions for the `task_plans` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Priority, StepStatus, TaskPlan};

/// Parameters for inserting a new plan step.
#[derive(Debug, Clone)]
pub struct NewTaskPlan {
    pub title: String,
    pub description: String,
    pub position: i32,
    pub estimated_duration: String,
    pub priority: Priority,
}

/// Insert a plan step under one of `owner`'s goals.
///
/// Fails with "goal not found" when the goal does not exist or belongs to
/// another user.
pub async fn insert_plan(
    pool: &PgPool,
    owner: Uuid,
    goal_id: Uuid,
    new: &NewTaskPlan,
) -> Result<TaskPlan> {
    let plan = sqlx::query_as::<_, TaskPlan>(
        "INSERT INTO task_plans (goal_id, title, description, position, estimated_duration, priority) \
         SELECT g.id, $3, $4, $5, $6, $7 FROM user_goals g \
         WHERE g.id = $1 AND g.user_id = $2 \
         RETURNING *",
    )
    .bind(goal_id)
    .bind(owner)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.position)
    .bind(&new.estimated_duration)
    .bind(new.priority)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to insert plan step {:?}", new.title))?;

    plan.with_context(|| format!("goal {goal_id} not found"))
}

/// Fetch a plan step by ID, if `owner` owns its goal.
pub async fn get_plan(pool: &PgPool, owner: Uuid, id: Uuid) -> Result<Option<TaskPlan>> {
    let plan = sqlx::query_as::<_, TaskPlan>(
        "SELECT p.* FROM task_plans p \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE p.id = $1 AND g.user_id = $2",
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await
    .context("failed to fetch plan step")?;

    Ok(plan)
}

/// List the steps of a goal, ordered by position.
pub async fn list_plans_for_goal(
    pool: &PgPool,
    owner: Uuid,
    goal_id: Uuid,
) -> Result<Vec<TaskPlan>> {
    let plans = sqlx::query_as::<_, TaskPlan>(
        "SELECT p.* FROM task_plans p \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE p.goal_id = $1 AND g.user_id = $2 \
         ORDER BY p.position ASC",
    )
    .bind(goal_id)
    .bind(owner)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list plan steps for goal {goal_id}"))?;

    Ok(plans)
}

/// Update the status of a plan step.
pub async fn update_plan_status(
    pool: &PgPool,
    owner: Uuid,
    id: Uuid,
    status: StepStatus,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE task_plans p SET status = $1 \
         FROM user_goals g \
         WHERE p.id = $2 AND g.id = p.goal_id AND g.user_id = $3",
    )
    .bind(status)
    .bind(id)
    .bind(owner)
    .execute(pool)
    .await
    .context("failed to update plan step status")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("plan step {id} not found");
    }

    Ok(())
}
