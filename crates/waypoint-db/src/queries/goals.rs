//! Database query functions for the `user_goals` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::UserGoal;

/// Insert a new goal for `owner`. Returns the row with server-generated
/// defaults (id, created_at).
pub async fn insert_goal(pool: &PgPool, owner: Uuid, goal_text: &str) -> Result<UserGoal> {
    let goal = sqlx::query_as::<_, UserGoal>(
        "INSERT INTO user_goals (user_id, goal_text) \
         VALUES ($1, $2) \
         RETURNING *",
    )
    .bind(owner)
    .bind(goal_text)
    .fetch_one(pool)
    .await
    .context("failed to insert goal")?;

    Ok(goal)
}

/// Fetch one of `owner`'s goals by ID.
pub async fn get_goal(pool: &PgPool, owner: Uuid, id: Uuid) -> Result<Option<UserGoal>> {
    let goal =
        sqlx::query_as::<_, UserGoal>("SELECT * FROM user_goals WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(pool)
            .await
            .context("failed to fetch goal")?;

    Ok(goal)
}

/// List `owner`'s goals, newest first.
pub async fn list_goals(pool: &PgPool, owner: Uuid) -> Result<Vec<UserGoal>> {
    let goals = sqlx::query_as::<_, UserGoal>(
        "SELECT * FROM user_goals WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(owner)
    .fetch_all(pool)
    .await
    .context("failed to list goals")?;

    Ok(goals)
}
