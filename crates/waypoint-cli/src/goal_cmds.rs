//! CLI handlers for goals, plan steps and sub-tasks.
//!
//! Implements:
//! - `waypoint goal create <text>`       -- expand a goal into five plan steps
//! - `waypoint goal list`                -- list the user's goals with progress
//! - `waypoint goal show <goal-id>`      -- show a goal's plan tree
//! - `waypoint step status <id> <status>` -- set a plan step's status
//! - `waypoint subtask toggle <id>`      -- flip a sub-task's completed flag

use anyhow::{Context, Result};
use uuid::Uuid;

use waypoint_core::goal::{ExpandedGoal, expand_goal, load_goal};
use waypoint_core::store::Store;
use waypoint_db::models::StepStatus;

use crate::{GoalCommands, StepCommands, SubtaskCommands};

/// Parse a UUID argument, naming what it was meant to identify on failure.
pub fn parse_id(kind: &str, input: &str) -> Result<Uuid> {
    Uuid::parse_str(input.trim()).with_context(|| format!("invalid {kind} ID: {input}"))
}

pub async fn run_goal_command(command: GoalCommands, store: &dyn Store) -> Result<()> {
    match command {
        GoalCommands::Create { text } => cmd_create(store, &text.join(" ")).await,
        GoalCommands::List => cmd_list(store).await,
        GoalCommands::Show { goal_id } => cmd_show(store, &goal_id).await,
    }
}

pub async fn run_step_command(command: StepCommands, store: &dyn Store) -> Result<()> {
    match command {
        StepCommands::Status { plan_id, status } => {
            let id = parse_id("plan step", &plan_id)?;
            set_step_status(store, id, status).await
        }
    }
}

pub async fn run_subtask_command(command: SubtaskCommands, store: &dyn Store) -> Result<()> {
    match command {
        SubtaskCommands::Toggle { sub_task_id } => {
            let id = parse_id("sub-task", &sub_task_id)?;
            let completed = store.toggle_sub_task(id).await?;
            let mark = if completed { "done" } else { "open" };
            println!("Sub-task {id} is now {mark}.");
            Ok(())
        }
    }
}

// -----------------------------------------------------------------------
// waypoint goal create
// -----------------------------------------------------------------------

async fn cmd_create(store: &dyn Store, text: &str) -> Result<()> {
    let expanded = expand_goal(store, text).await?;

    println!("Goal created.");
    println!();
    println!("  Goal ID: {}", expanded.goal.id);
    println!("  Goal:    {}", expanded.goal.goal_text);
    println!();
    print_tree(&expanded);
    Ok(())
}

// -----------------------------------------------------------------------
// waypoint goal list
// -----------------------------------------------------------------------

async fn cmd_list(store: &dyn Store) -> Result<()> {
    let goals = store.list_goals().await?;

    if goals.is_empty() {
        println!("No goals found.");
        return Ok(());
    }

    println!("{:<38} {:<40} {:>10}", "ID", "GOAL", "PROGRESS");
    println!("{}", "-".repeat(90));

    for goal in &goals {
        let expanded = load_goal(store, goal.id).await?;
        let (done, total) = expanded.progress();
        println!(
            "{:<38} {:<40} {:>10}",
            goal.id,
            truncate(&goal.goal_text, 38),
            format!("{done}/{total}")
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// waypoint goal show
// -----------------------------------------------------------------------

async fn cmd_show(store: &dyn Store, goal_id: &str) -> Result<()> {
    let id = parse_id("goal", goal_id)?;
    let expanded = load_goal(store, id).await?;

    println!("Goal: {} ({})", expanded.goal.goal_text, expanded.goal.id);
    println!(
        "Created: {}",
        expanded.goal.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let (done, total) = expanded.progress();
    println!("Progress: {done}/{total} sub-tasks");
    println!();
    print_tree(&expanded);
    Ok(())
}

/// Print every step with its sub-task checklist.
pub fn print_tree(expanded: &ExpandedGoal) {
    for step in &expanded.steps {
        let plan = &step.plan;
        let (done, total) = step.progress();
        println!(
            "{}. [{}] {} ({} priority, {}) {done}/{total}",
            plan.position + 1,
            status_icon(plan.status),
            plan.title,
            plan.priority,
            plan.estimated_duration,
        );
        println!("     id: {}", plan.id);
        for sub in &step.sub_tasks {
            let check = if sub.completed { "x" } else { " " };
            println!("     [{check}] {} ({})", sub.title, sub.id);
        }
    }
}

fn status_icon(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => ".",
        StepStatus::InProgress => "*",
        StepStatus::Completed => "+",
    }
}

// -----------------------------------------------------------------------
// waypoint step status
// -----------------------------------------------------------------------

async fn set_step_status(store: &dyn Store, id: Uuid, status: StepStatus) -> Result<()> {
    store.update_plan_status(id, status).await?;
    println!("Plan step {id} marked {status}.");
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
