//! Database query functions for the `execution_requests` and
//! `execution_results` tables.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{ExecutionRequest, ExecutionResult, ExecutionType, RequestStatus};

/// Parameters for inserting an execution result row.
#[derive(Debug, Clone)]
pub struct NewExecutionResult {
    pub output_type: String,
    pub content: String,
    pub file_path: Option<String>,
    pub success: bool,
}

/// Insert an execution request against a plan step owned by `owner`.
pub async fn insert_execution_request(
    pool: &PgPool,
    owner: Uuid,
    plan_id: Uuid,
    execution_type: ExecutionType,
    instructions: &str,
    status: RequestStatus,
) -> Result<ExecutionRequest> {
    let request = sqlx::query_as::<_, ExecutionRequest>(
        "INSERT INTO execution_requests (plan_id, execution_type, instructions, status) \
         SELECT p.id, $3, $4, $5 FROM task_plans p \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE p.id = $1 AND g.user_id = $2 \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(owner)
    .bind(execution_type)
    .bind(instructions)
    .bind(status)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to insert execution request for plan step {plan_id}"))?;

    request.with_context(|| format!("plan step {plan_id} not found"))
}

/// Set an execution request's status. Terminal statuses stamp `completed_at`.
pub async fn update_execution_request_status(
    pool: &PgPool,
    owner: Uuid,
    id: Uuid,
    status: RequestStatus,
) -> Result<()> {
    let completed_at = status.is_terminal().then(Utc::now);
    let result = sqlx::query(
        "UPDATE execution_requests r \
         SET status = $1, completed_at = COALESCE($2, r.completed_at) \
         FROM task_plans p, user_goals g \
         WHERE r.id = $3 AND p.id = r.plan_id AND g.id = p.goal_id AND g.user_id = $4",
    )
    .bind(status)
    .bind(completed_at)
    .bind(id)
    .bind(owner)
    .execute(pool)
    .await
    .with_context(|| format!("failed to set execution request {id} to {status}"))?;

    if result.rows_affected() == 0 {
        anyhow::bail!("execution request {id} not found");
    }

    Ok(())
}

/// List the execution requests of a plan step, oldest first.
pub async fn list_execution_requests(
    pool: &PgPool,
    owner: Uuid,
    plan_id: Uuid,
) -> Result<Vec<ExecutionRequest>> {
    let requests = sqlx::query_as::<_, ExecutionRequest>(
        "SELECT r.* FROM execution_requests r \
         JOIN task_plans p ON p.id = r.plan_id \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE r.plan_id = $1 AND g.user_id = $2 \
         ORDER BY r.created_at ASC",
    )
    .bind(plan_id)
    .bind(owner)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list execution requests for plan step {plan_id}"))?;

    Ok(requests)
}

/// Insert a result row tagged with its request.
pub async fn insert_execution_result(
    pool: &PgPool,
    owner: Uuid,
    request_id: Uuid,
    new: &NewExecutionResult,
) -> Result<ExecutionResult> {
    let result = sqlx::query_as::<_, ExecutionResult>(
        "INSERT INTO execution_results (request_id, output_type, content, file_path, success) \
         SELECT r.id, $3, $4, $5, $6 FROM execution_requests r \
         JOIN task_plans p ON p.id = r.plan_id \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE r.id = $1 AND g.user_id = $2 \
         RETURNING *",
    )
    .bind(request_id)
    .bind(owner)
    .bind(&new.output_type)
    .bind(&new.content)
    .bind(&new.file_path)
    .bind(new.success)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to insert execution result for request {request_id}"))?;

    result.with_context(|| format!("execution request {request_id} not found"))
}

/// List the results of an execution request, oldest first.
pub async fn list_execution_results(
    pool: &PgPool,
    owner: Uuid,
    request_id: Uuid,
) -> Result<Vec<ExecutionResult>> {
    let results = sqlx::query_as::<_, ExecutionResult>(
        "SELECT res.* FROM execution_results res \
         JOIN execution_requests r ON r.id = res.request_id \
         JOIN task_plans p ON p.id = r.plan_id \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE res.request_id = $1 AND g.user_id = $2 \
         ORDER BY res.created_at ASC",
    )
    .bind(request_id)
    .bind(owner)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list execution results for request {request_id}"))?;

    Ok(results)
}
