//! Database query functions for the `sub_tasks` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::SubTask;

/// Parameters for inserting a new sub-task.
#[derive(Debug, Clone)]
pub struct NewSubTask {
    pub title: String,
    pub description: String,
    pub position: i32,
}

/// Insert a sub-task under a plan step owned by `owner`.
pub async fn insert_sub_task(
    pool: &PgPool,
    owner: Uuid,
    plan_id: Uuid,
    new: &NewSubTask,
) -> Result<SubTask> {
    let sub_task = sqlx::query_as::<_, SubTask>(
        "INSERT INTO sub_tasks (plan_id, title, description, position) \
         SELECT p.id, $3, $4, $5 FROM task_plans p \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE p.id = $1 AND g.user_id = $2 \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(owner)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.position)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to insert sub-task {:?}", new.title))?;

    sub_task.with_context(|| format!("plan step {plan_id} not found"))
}

/// List a plan step's sub-tasks, ordered by position.
pub async fn list_sub_tasks_for_plan(
    pool: &PgPool,
    owner: Uuid,
    plan_id: Uuid,
) -> Result<Vec<SubTask>> {
    let sub_tasks = sqlx::query_as::<_, SubTask>(
        "SELECT s.* FROM sub_tasks s \
         JOIN task_plans p ON p.id = s.plan_id \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE s.plan_id = $1 AND g.user_id = $2 \
         ORDER BY s.position ASC",
    )
    .bind(plan_id)
    .bind(owner)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list sub-tasks for plan step {plan_id}"))?;

    Ok(sub_tasks)
}

/// Flip a sub-task's `completed` flag. Returns the new value.
pub async fn toggle_sub_task(pool: &PgPool, owner: Uuid, id: Uuid) -> Result<bool> {
    let completed: Option<bool> = sqlx::query_scalar(
        "UPDATE sub_tasks s SET completed = NOT s.completed \
         FROM task_plans p, user_goals g \
         WHERE s.id = $1 AND p.id = s.plan_id AND g.id = p.goal_id AND g.user_id = $2 \
         RETURNING s.completed",
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await
    .context("failed to toggle sub-task")?;

    completed.with_context(|| format!("sub-task {id} not found"))
}
