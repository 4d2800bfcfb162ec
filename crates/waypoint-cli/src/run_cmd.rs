//! `waypoint run` command: auto-start every step of a goal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use waypoint_core::agent::{AgentRecorder, ContentGenerator};
use waypoint_core::goal::load_goal;
use waypoint_core::runner::{
    AutoStartPreferences, PhaseFailurePolicy, PhaseResult, RunOutcome, RunSummary, RunnerConfig,
    RunnerStatus, WorkflowRunner,
};
use waypoint_core::store::Store;
use waypoint_core::templates::ResearchDepth;
use waypoint_db::models::{DeploymentProvider, ExecutionType};

use crate::goal_cmds::parse_id;

/// Phase selection and pacing for an auto-start run.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Do not run the research phase
    #[arg(long)]
    pub skip_research: bool,
    /// Do not run the execution phase
    #[arg(long)]
    pub skip_execution: bool,
    /// Do not run the deployment phase
    #[arg(long)]
    pub skip_deployment: bool,
    /// Research depth: basic, standard, comprehensive
    #[arg(long, default_value_t = ResearchDepth::Standard)]
    pub depth: ResearchDepth,
    /// Execution mode: code_generation, script_execution, api_call, file_creation
    #[arg(long, default_value_t = ExecutionType::CodeGeneration)]
    pub mode: ExecutionType,
    /// Deployment provider: vercel, netlify, github_pages
    #[arg(long, default_value_t = DeploymentProvider::Vercel)]
    pub provider: DeploymentProvider,
    /// Delay after each phase, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub delay_ms: u64,
    /// Go straight to the next step without pausing
    #[arg(long)]
    pub no_step_pause: bool,
    /// Keep running a step's remaining phases after one fails
    #[arg(long, conflicts_with = "skip_on_any_failure")]
    pub continue_on_failure: bool,
    /// Also skip a step's remaining phases after a recorded failure
    #[arg(long)]
    pub skip_on_any_failure: bool,
}

impl RunArgs {
    pub fn preferences(&self) -> AutoStartPreferences {
        AutoStartPreferences {
            research: !self.skip_research,
            execution: !self.skip_execution,
            deployment: !self.skip_deployment,
            research_depth: self.depth,
            execution_mode: self.mode,
            deployment_provider: self.provider,
            auto_progress_delay: Duration::from_millis(self.delay_ms),
            pause_between_steps: !self.no_step_pause,
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        let on_phase_failure = if self.continue_on_failure {
            PhaseFailurePolicy::ContinueStep
        } else if self.skip_on_any_failure {
            PhaseFailurePolicy::SkipStepOnAnyFailure
        } else {
            PhaseFailurePolicy::SkipStep
        };
        RunnerConfig {
            on_phase_failure,
            ..Default::default()
        }
    }
}

/// Run the auto-start command.
pub async fn run_auto_start(
    store: Arc<dyn Store>,
    generator: Arc<dyn ContentGenerator>,
    goal_id_str: &str,
    args: &RunArgs,
) -> Result<()> {
    let goal_id = parse_id("goal", goal_id_str)?;

    // Set up graceful shutdown: first signal cancels, second force-exits.
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let got_first_signal = Arc::new(AtomicBool::new(false));
    let got_first_clone = Arc::clone(&got_first_signal);

    tokio::spawn(async move {
        loop {
            tokio::signal::ctrl_c().await.ok();
            if got_first_clone.swap(true, Ordering::SeqCst) {
                eprintln!("\nForce exit.");
                std::process::exit(130);
            }
            eprintln!("\nStopping after the current phase (Ctrl+C again to force)...");
            cancel_clone.cancel();
        }
    });

    let summary = execute_run(
        store,
        generator,
        goal_id,
        &args.preferences(),
        args.runner_config(),
        cancel,
    )
    .await?;

    print_summary(&summary);

    if summary.outcome == RunOutcome::Stopped {
        println!("\nRun stopped by signal. Results recorded so far are kept.");
        std::process::exit(130);
    }

    Ok(())
}

/// Load the goal and drive the workflow runner over its steps, printing
/// each phase as it starts.
pub async fn execute_run(
    store: Arc<dyn Store>,
    generator: Arc<dyn ContentGenerator>,
    goal_id: Uuid,
    prefs: &AutoStartPreferences,
    config: RunnerConfig,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let expanded = load_goal(store.as_ref(), goal_id).await?;
    let steps = expanded.plans();

    println!(
        "Auto-starting \"{}\": {} steps, phases: {}",
        expanded.goal.goal_text,
        steps.len(),
        prefs
            .enabled_phases()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let recorder = Arc::new(AgentRecorder::new(store, generator));
    let runner = WorkflowRunner::new(recorder, config);

    let mut rx = runner.subscribe();
    let titles: Vec<String> = steps.iter().map(|s| s.title.clone()).collect();
    let printer = tokio::spawn(async move {
        let mut last = None;
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().status;
            if last == Some(status) {
                continue;
            }
            last = Some(status);
            if let RunnerStatus::Running {
                step,
                phase: Some(phase),
            } = status
            {
                let title = titles.get(step).map(String::as_str).unwrap_or("?");
                println!("[{}/{}] {title}: {phase}", step + 1, titles.len());
            }
        }
    });

    let summary = runner.run(&steps, prefs, cancel).await;
    printer.abort();

    tracing::debug!(goal_id = %goal_id, steps = summary.steps.len(), "goal run returned");

    Ok(summary)
}

/// Print one line per phase of every step the run entered.
pub fn print_summary(summary: &RunSummary) {
    println!();
    println!("Summary:");
    for report in &summary.steps {
        let mark = if report.auto_completed { "+" } else { "." };
        println!("  [{mark}] {}", report.title);
        for record in &report.phases {
            let line = match &record.result {
                PhaseResult::Completed { request_id } => format!("completed ({request_id})"),
                PhaseResult::Degraded { request_id } => {
                    format!("fallback content ({request_id})")
                }
                PhaseResult::Failed { request_id, error } => {
                    format!("failed: {error} ({request_id})")
                }
                PhaseResult::Aborted { error } => format!("not recorded: {error}"),
                PhaseResult::Skipped => "skipped".to_string(),
            };
            println!("      {:<11} {line}", record.phase.to_string());
        }
    }
    println!(
        "\n{} agent calls, {} failed.",
        summary.recorder_calls(),
        summary.failed_phases()
    );
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use waypoint_core::agent::TemplateGenerator;
    use waypoint_core::goal::expand_goal;
    use waypoint_core::store::MemoryStore;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RunArgs,
    }

    #[test]
    fn default_args_enable_everything() {
        let args = Harness::parse_from(["waypoint"]).args;
        let prefs = args.preferences();
        assert_eq!(prefs, AutoStartPreferences::default());
        assert_eq!(
            args.runner_config().on_phase_failure,
            PhaseFailurePolicy::SkipStep
        );
    }

    #[test]
    fn flags_map_onto_preferences() {
        let args = Harness::parse_from([
            "waypoint",
            "--skip-deployment",
            "--depth",
            "comprehensive",
            "--mode",
            "file_creation",
            "--provider",
            "github_pages",
            "--delay-ms",
            "0",
            "--no-step-pause",
            "--continue-on-failure",
        ])
        .args;
        let prefs = args.preferences();
        assert!(prefs.research && prefs.execution && !prefs.deployment);
        assert_eq!(prefs.research_depth, ResearchDepth::Comprehensive);
        assert_eq!(prefs.execution_mode, ExecutionType::FileCreation);
        assert_eq!(prefs.deployment_provider, DeploymentProvider::GithubPages);
        assert_eq!(prefs.auto_progress_delay, Duration::ZERO);
        assert!(!prefs.pause_between_steps);
        assert_eq!(
            args.runner_config().on_phase_failure,
            PhaseFailurePolicy::ContinueStep
        );
    }

    #[test]
    fn strict_failure_flag_selects_strict_policy() {
        let args = Harness::parse_from(["waypoint", "--skip-on-any-failure"]).args;
        assert_eq!(
            args.runner_config().on_phase_failure,
            PhaseFailurePolicy::SkipStepOnAnyFailure
        );

        let both = Harness::try_parse_from([
            "waypoint",
            "--skip-on-any-failure",
            "--continue-on-failure",
        ]);
        assert!(both.is_err());
    }

    #[tokio::test]
    async fn execute_run_covers_every_step() {
        let store = Arc::new(MemoryStore::new(Uuid::new_v4()));
        let expanded = expand_goal(store.as_ref(), "Plan a trip").await.unwrap();
        let prefs = AutoStartPreferences {
            auto_progress_delay: Duration::ZERO,
            pause_between_steps: false,
            ..Default::default()
        };

        let summary = execute_run(
            store,
            Arc::new(TemplateGenerator::instant()),
            expanded.goal.id,
            &prefs,
            RunnerConfig::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.steps.len(), 5);
        assert_eq!(summary.recorder_calls(), 15);
        print_summary(&summary);
    }

    #[tokio::test]
    async fn execute_run_of_unknown_goal_fails() {
        let store = Arc::new(MemoryStore::new(Uuid::new_v4()));
        let result = execute_run(
            store,
            Arc::new(TemplateGenerator::instant()),
            Uuid::new_v4(),
            &AutoStartPreferences::default(),
            RunnerConfig::default(),
            CancellationToken::new(),
        )
        .await;
        assert!(result.is_err());
    }
}
