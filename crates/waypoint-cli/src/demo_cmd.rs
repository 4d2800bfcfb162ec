//! `waypoint demo` command: the whole flow against an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use waypoint_core::agent::{AgentDomain, ContentGenerator, LatencyConfig, TemplateGenerator};
use waypoint_core::goal::expand_goal;
use waypoint_core::runner::{AutoStartPreferences, RunSummary, RunnerConfig};
use waypoint_core::store::{MemoryStore, Store};

use crate::goal_cmds::print_tree;
use crate::run_cmd::{execute_run, print_summary};

/// Expand `goal_text`, tick one sub-task, auto-start every step and print
/// what was recorded. Nothing touches the database.
///
/// With `realtime` the simulated agent latency and phase delays are kept.
pub async fn run_demo(goal_text: &str, realtime: bool) -> Result<RunSummary> {
    let store = Arc::new(MemoryStore::new(Uuid::new_v4()));

    // 1. Expand the goal.
    let expanded = expand_goal(store.as_ref(), goal_text).await?;
    println!("Goal: {}", expanded.goal.goal_text);
    println!();
    print_tree(&expanded);
    println!();

    // 2. Check off the first sub-task of the first step.
    if let Some(first) = expanded.steps.first().and_then(|s| s.sub_tasks.first()) {
        store.toggle_sub_task(first.id).await?;
        println!("Checked off \"{}\".", first.title);
        println!();
    }

    // 3. Auto-start every step.
    let (latency, delay) = if realtime {
        (LatencyConfig::default(), AutoStartPreferences::default().auto_progress_delay)
    } else {
        (LatencyConfig::zero(), Duration::ZERO)
    };
    let generator: Arc<dyn ContentGenerator> = Arc::new(TemplateGenerator::new(latency));
    let prefs = AutoStartPreferences {
        auto_progress_delay: delay,
        pause_between_steps: realtime,
        ..Default::default()
    };
    let summary = execute_run(
        store.clone(),
        generator,
        expanded.goal.id,
        &prefs,
        RunnerConfig::default(),
        CancellationToken::new(),
    )
    .await?;
    print_summary(&summary);

    // 4. Count what landed in the store.
    println!();
    println!("Stored requests:");
    for domain in AgentDomain::ALL {
        let mut requests = 0;
        let mut results = 0;
        for step in &expanded.steps {
            for request in store.list_requests(step.plan.id, domain).await? {
                requests += 1;
                results += store.list_results(domain, request.id).await?.len();
            }
        }
        println!("  {domain:<11} {requests} requests, {results} results");
    }

    Ok(summary)
}
