//! Database query functions for the `research_requests` and
//! `research_results` tables.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{RequestStatus, ResearchRequest, ResearchResult};

/// Parameters for inserting a research result row.
#[derive(Debug, Clone)]
pub struct NewResearchResult {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub relevance_score: f64,
}

/// Insert a research request against a plan step owned by `owner`.
pub async fn insert_research_request(
    pool: &PgPool,
    owner: Uuid,
    plan_id: Uuid,
    query: &str,
    status: RequestStatus,
) -> Result<ResearchRequest> {
    let request = sqlx::query_as::<_, ResearchRequest>(
        "INSERT INTO research_requests (plan_id, query, status) \
         SELECT p.id, $3, $4 FROM task_plans p \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE p.id = $1 AND g.user_id = $2 \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(owner)
    .bind(query)
    .bind(status)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to insert research request for plan step {plan_id}"))?;

    request.with_context(|| format!("plan step {plan_id} not found"))
}

/// Set a research request's status. Terminal statuses stamp `completed_at`.
pub async fn update_research_request_status(
    pool: &PgPool,
    owner: Uuid,
    id: Uuid,
    status: RequestStatus,
) -> Result<()> {
    let completed_at = status.is_terminal().then(Utc::now);
    let result = sqlx::query(
        "UPDATE research_requests r \
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
    .with_context(|| format!("failed to set research request {id} to {status}"))?;

    if result.rows_affected() == 0 {
        anyhow::bail!("research request {id} not found");
    }

    Ok(())
}

/// List the research requests of a plan step, oldest first.
pub async fn list_research_requests(
    pool: &PgPool,
    owner: Uuid,
    plan_id: Uuid,
) -> Result<Vec<ResearchRequest>> {
    let requests = sqlx::query_as::<_, ResearchRequest>(
        "SELECT r.* FROM research_requests r \
         JOIN task_plans p ON p.id = r.plan_id \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE r.plan_id = $1 AND g.user_id = $2 \
         ORDER BY r.created_at ASC",
    )
    .bind(plan_id)
    .bind(owner)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list research requests for plan step {plan_id}"))?;

    Ok(requests)
}

/// Insert a result row tagged with its request.
pub async fn insert_research_result(
    pool: &PgPool,
    owner: Uuid,
    request_id: Uuid,
    new: &NewResearchResult,
) -> Result<ResearchResult> {
    let result = sqlx::query_as::<_, ResearchResult>(
        "INSERT INTO research_results (request_id, title, content, summary, relevance_score) \
         SELECT r.id, $3, $4, $5, $6 FROM research_requests r \
         JOIN task_plans p ON p.id = r.plan_id \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE r.id = $1 AND g.user_id = $2 \
         RETURNING *",
    )
    .bind(request_id)
    .bind(owner)
    .bind(&new.title)
    .bind(&new.content)
    .bind(&new.summary)
    .bind(new.relevance_score)
    .fetch_optional(pool)
    .await
    .with_context(|| format!("failed to insert research result for request {request_id}"))?;

    result.with_context(|| format!("research request {request_id} not found"))
}

/// List the results of a research request, oldest first.
pub async fn list_research_results(
    pool: &PgPool,
    owner: Uuid,
    request_id: Uuid,
) -> Result<Vec<ResearchResult>> {
    let results = sqlx::query_as::<_, ResearchResult>(
        "SELECT res.* FROM research_results res \
         JOIN research_requests r ON r.id = res.request_id \
         JOIN task_plans p ON p.id = r.plan_id \
         JOIN user_goals g ON g.id = p.goal_id \
         WHERE res.request_id = $1 AND g.user_id = $2 \
         ORDER BY res.created_at ASC",
    )
    .bind(request_id)
    .bind(owner)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to list research results for request {request_id}"))?;

    Ok(results)
}
