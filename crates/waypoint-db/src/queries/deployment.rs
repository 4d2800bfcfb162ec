//! Database query functions for the `deployment_requests` and
//! `deployment_results` tables.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{DeploymentProvider, DeploymentRequest, DeploymentResult, RequestStatus};

/// Parameters for inserting a deployment result row.
#[derive(Debug, Clone)]
pub struct NewDeploymentResult {
    pub deployment_url: Option<String>,
    pub claim_url: Option<String>,
    pub success: bool,
    pub logs: String,
}

/// Insert a deployment request against a plan step owned by `owner`.
pub async fn insert_deployment_request(
    pool: &PgPool,
    owner: Uuid,
    plan_id: Uuid,
    provider: DeploymentProvider,
    configuration: &Value,
    status: RequestStatus,
) -> Result<DeploymentRequest> {
    let request = sqlx::query_as::<_, DeploymentRequest>(
        "INSERT INTO deployment_requests (plan_id, deployment_type, configuration, status) \
         SELECT p.id, $3, $4, $5 FROM task_plans p \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE p.id = $1 AND g.user_id = $2 \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(owner)
    .bind(provider)
    .bind(configuration)
    .bind(status)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to insert deployment request for plan step {plan_id}"))?;

    request.with_context(|| format!("plan step {plan_id} not found"))
}

/// Set a deployment request's status. Terminal statuses stamp `completed_at`.
pub async fn update_deployment_request_status(
    pool: &PgPool,
    owner: Uuid,
    id: Uuid,
    status: RequestStatus,
) -> Result<()> {
    let completed_at = status.is_terminal().then(Utc::now);
    let result = sqlx::query(
        "UPDATE deployment_requests r \
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
    .with_context(|| format!("failed to set deployment request {id} to {status}"))?;

    if result.rows_affected() == 0 {
        anyhow::bail!("deployment request {id} not found");
    }

    Ok(())
}

/// List the deployment requests of a plan step, oldest first.
pub async fn list_deployment_requests(
    pool: &PgPool,
    owner: Uuid,
    plan_id: Uuid,
) -> Result<Vec<DeploymentRequest>> {
    let requests = sqlx::query_as::<_, DeploymentRequest>(
        "SELECT r.* FROM deployment_requests r \
         JOIN task_plans p ON p.id = r.plan_id \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE r.plan_id = $1 AND g.user_id = $2 \
         ORDER BY r.created_at ASC",
    )
    .bind(plan_id)
    .bind(owner)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list deployment requests for plan step {plan_id}"))?;

    Ok(requests)
}

/// Insert a result row tagged with its request.
pub async fn insert_deployment_result(
    pool: &PgPool,
    owner: Uuid,
    request_id: Uuid,
    new: &NewDeploymentResult,
) -> Result<DeploymentResult> {
    let result = sqlx::query_as::<_, DeploymentResult>(
        "INSERT INTO deployment_results (request_id, deployment_url, claim_url, success, logs) \
         SELECT r.id, $3, $4, $5, $6 FROM deployment_requests r \
         JOIN task_plans p ON p.id = r.plan_id \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE r.id = $1 AND g.user_id = $2 \
         RETURNING *",
    )
    .bind(request_id)
    .bind(owner)
    .bind(&new.deployment_url)
    .bind(&new.claim_url)
    .bind(new.success)
    .bind(&new.logs)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to insert deployment result for request {request_id}"))?;

    result.with_context(|| format!("deployment request {request_id} not found"))
}

/// List the results of a deployment request, oldest first.
pub async fn list_deployment_results(
    pool: &PgPool,
    owner: Uuid,
    request_id: Uuid,
) -> Result<Vec<DeploymentResult>> {
    let results = sqlx::query_as::<_, DeploymentResult>(
        "SELECT res.* FROM deployment_results res \
         JOIN deployment_requests r ON r.id = res.request_id \
         JOIN task_plans p ON p.id = r.plan_id \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE res.request_id = $1 AND g.user_id = $2 \
         ORDER BY res.created_at ASC",
    )
    .bind(request_id)
    .bind(owner)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list deployment results for request {request_id}"))?;

    Ok(results)
}
