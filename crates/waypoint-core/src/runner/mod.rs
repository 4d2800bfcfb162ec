//! Auto-start workflow runner.
//!
//! Walks the plan steps of a goal in order and, for each step, runs the
//! enabled agent phases one after another:
//!
//! ```text
//! Idle --run--> Running{0, research} -> Running{0, execution} -> Running{0, deployment}
//!                   -> Running{1, research} -> ... -> Idle
//!                          |
//!                       cancel
//!                          v
//!                       Stopped -> Idle
//! ```
//!
//! Each phase is awaited to completion, so its request is terminal before
//! the next phase starts. A fixed delay follows every phase that ran, and an
//! optional pause separates steps. Phase failures are logged and never end
//! the run. Cancellation is checked between phases and between steps; a
//! recorder call already in flight is never interrupted, but delays wake up
//! immediately.
//!
//! The runner never changes plan-step status in the store. The "started"
//! and "auto-completed" marks live only in the published [`RunnerState`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use waypoint_db::models::{DeploymentProvider, ExecutionType, TaskPlan};

use crate::agent::{AgentDomain, AgentOutcome, Recorder, RequestInput};
use crate::templates::{ResearchDepth, deployment_slug};

/// Caller choices for one run. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoStartPreferences {
    pub research: bool,
    pub execution: bool,
    pub deployment: bool,
    pub research_depth: ResearchDepth,
    pub execution_mode: ExecutionType,
    pub deployment_provider: DeploymentProvider,
    /// Delay after every phase that ran.
    pub auto_progress_delay: Duration,
    pub pause_between_steps: bool,
}

impl Default for AutoStartPreferences {
    fn default() -> Self {
        Self {
            research: true,
            execution: true,
            deployment: true,
            research_depth: ResearchDepth::Standard,
            execution_mode: ExecutionType::CodeGeneration,
            deployment_provider: DeploymentProvider::Vercel,
            auto_progress_delay: Duration::from_secs(2),
            pause_between_steps: true,
        }
    }
}

impl AutoStartPreferences {
    /// Enabled phases in workflow order.
    pub fn enabled_phases(&self) -> Vec<AgentDomain> {
        AgentDomain::ALL
            .into_iter()
            .filter(|phase| match phase {
                AgentDomain::Research => self.research,
                AgentDomain::Execution => self.execution,
                AgentDomain::Deployment => self.deployment,
            })
            .collect()
    }

    /// The recorder input for `phase` on `step`.
    pub fn input_for(&self, phase: AgentDomain, step: &TaskPlan) -> RequestInput {
        match phase {
            AgentDomain::Research => RequestInput::Research {
                query: research_query(step, self.research_depth),
            },
            AgentDomain::Execution => RequestInput::Execution {
                execution_type: self.execution_mode,
                instructions: execution_instructions(step, self.execution_mode),
            },
            AgentDomain::Deployment => RequestInput::Deployment {
                provider: self.deployment_provider,
                configuration: deployment_configuration(step, self.deployment_provider),
            },
        }
    }
}

/// `"{title} ({depth} research)"`
pub fn research_query(step: &TaskPlan, depth: ResearchDepth) -> String {
    format!("{} ({depth} research)", step.title)
}

/// `"{title}: {description} [mode: {mode}]"`
pub fn execution_instructions(step: &TaskPlan, mode: ExecutionType) -> String {
    format!("{}: {} [mode: {mode}]", step.title, step.description)
}

/// `{"provider": ..., "project_name": <slug of the title>}`
pub fn deployment_configuration(step: &TaskPlan, provider: DeploymentProvider) -> Value {
    json!({
        "provider": provider,
        "project_name": deployment_slug(&step.title),
    })
}

/// What to do with the rest of a step after one of its phases fails.
///
/// A phase whose request was recorded but whose content failed is
/// [`PhaseResult::Failed`]; a phase the recorder could not record at all is
/// [`PhaseResult::Aborted`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhaseFailurePolicy {
    /// Skip the step's remaining phases after an aborted phase. Recorded
    /// failures are logged and the step carries on.
    #[default]
    SkipStep,
    /// Skip the step's remaining phases after any failed or aborted phase.
    SkipStepOnAnyFailure,
    /// Keep running the step's remaining phases.
    ContinueStep,
}

impl PhaseFailurePolicy {
    fn skips_after(self, result: &PhaseResult) -> bool {
        match self {
            Self::SkipStep => matches!(result, PhaseResult::Aborted { .. }),
            Self::SkipStepOnAnyFailure => result.is_failure(),
            Self::ContinueStep => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Pause between steps when the preferences ask for one.
    pub step_pause: Duration,
    pub on_phase_failure: PhaseFailurePolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            step_pause: Duration::from_secs(2),
            on_phase_failure: PhaseFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunnerStatus {
    #[default]
    Idle,
    /// `phase` is `None` between phases.
    Running {
        step: usize,
        phase: Option<AgentDomain>,
    },
    Stopped,
}

/// Snapshot published after every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerState {
    pub status: RunnerStatus,
    /// Plan steps marked started when the run began.
    pub started: Vec<Uuid>,
    /// Plan steps whose phases all ran.
    pub auto_completed: Vec<Uuid>,
    /// Set when the last run ended through cancellation.
    pub stopped: bool,
}

impl RunnerState {
    pub fn current_step(&self) -> Option<usize> {
        match self.status {
            RunnerStatus::Running { step, .. } => Some(step),
            _ => None,
        }
    }

    pub fn current_phase(&self) -> Option<AgentDomain> {
        match self.status {
            RunnerStatus::Running { phase, .. } => phase,
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, RunnerStatus::Running { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseResult {
    Completed { request_id: Uuid },
    /// Generation failed but fallback content was produced.
    Degraded { request_id: Uuid },
    /// The request was recorded and marked failed.
    Failed { request_id: Uuid, error: String },
    /// The recorder returned an error, so no request was recorded.
    Aborted { error: String },
    /// Not run because an earlier phase of the step failed.
    Skipped,
}

impl PhaseResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Aborted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseRecord {
    pub phase: AgentDomain,
    pub result: PhaseResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub plan_id: Uuid,
    pub title: String,
    pub phases: Vec<PhaseRecord>,
    pub auto_completed: bool,
}

impl StepReport {
    fn new(step: &TaskPlan) -> Self {
        Self {
            plan_id: step.id,
            title: step.title.clone(),
            phases: Vec::new(),
            auto_completed: false,
        }
    }

    pub fn has_failure(&self) -> bool {
        self.phases.iter().any(|p| p.result.is_failure())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// One report per step that was entered, in order.
    pub steps: Vec<StepReport>,
}

impl RunSummary {
    pub fn failed_phases(&self) -> usize {
        self.steps
            .iter()
            .flat_map(|s| &s.phases)
            .filter(|p| p.result.is_failure())
            .count()
    }

    /// Phases that reached the recorder.
    pub fn recorder_calls(&self) -> usize {
        self.steps
            .iter()
            .flat_map(|s| &s.phases)
            .filter(|p| p.result != PhaseResult::Skipped)
            .count()
    }
}

/// Sequential multi-step, multi-phase runner.
///
/// One run at a time: concurrent calls to [`run`](Self::run) on the same
/// runner interleave their state snapshots.
pub struct WorkflowRunner {
    recorder: Arc<dyn Recorder>,
    config: RunnerConfig,
    state: watch::Sender<RunnerState>,
}

impl WorkflowRunner {
    pub fn new(recorder: Arc<dyn Recorder>, config: RunnerConfig) -> Self {
        let (state, _) = watch::channel(RunnerState::default());
        Self {
            recorder,
            config,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RunnerState> {
        self.state.subscribe()
    }

    /// The latest snapshot.
    pub fn state(&self) -> RunnerState {
        self.state.borrow().clone()
    }

    fn publish(&self, update: impl FnOnce(&mut RunnerState)) {
        self.state.send_modify(update);
    }

    /// Sleep for `duration` or until `cancel` fires, whichever is first.
    async fn pause(duration: Duration, cancel: &CancellationToken) {
        if duration.is_zero() {
            return;
        }
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }

    async fn run_phase(
        &self,
        step: &TaskPlan,
        phase: AgentDomain,
        prefs: &AutoStartPreferences,
    ) -> PhaseResult {
        let input = prefs.input_for(phase, step);
        match self.recorder.record(step.id, input).await {
            Ok(run) => {
                let request_id = run.request.id;
                match run.outcome {
                    AgentOutcome::Completed(_) => PhaseResult::Completed { request_id },
                    AgentOutcome::Degraded { .. } => PhaseResult::Degraded { request_id },
                    AgentOutcome::Failed { error } => PhaseResult::Failed {
                        request_id,
                        error: error.to_string(),
                    },
                }
            }
            Err(e) => PhaseResult::Aborted {
                error: e.to_string(),
            },
        }
    }

    /// Run every enabled phase of every step, in order.
    pub async fn run(
        &self,
        steps: &[TaskPlan],
        prefs: &AutoStartPreferences,
        cancel: CancellationToken,
    ) -> RunSummary {
        let phases = prefs.enabled_phases();
        tracing::info!(
            steps = steps.len(),
            phases = phases.len(),
            "auto-start run started"
        );

        self.publish(|s| {
            *s = RunnerState {
                status: RunnerStatus::Running {
                    step: 0,
                    phase: None,
                },
                started: steps.iter().map(|p| p.id).collect(),
                auto_completed: Vec::new(),
                stopped: false,
            };
        });

        let mut reports = Vec::with_capacity(steps.len());
        let mut outcome = RunOutcome::Completed;

        'steps: for (index, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                outcome = RunOutcome::Stopped;
                break;
            }

            let mut report = StepReport::new(step);
            let mut skip_rest = false;

            for &phase in &phases {
                if cancel.is_cancelled() {
                    outcome = RunOutcome::Stopped;
                    reports.push(report);
                    break 'steps;
                }
                if skip_rest {
                    report.phases.push(PhaseRecord {
                        phase,
                        result: PhaseResult::Skipped,
                    });
                    continue;
                }

                self.publish(|s| {
                    s.status = RunnerStatus::Running {
                        step: index,
                        phase: Some(phase),
                    };
                });

                let result = self.run_phase(step, phase, prefs).await;
                match &result {
                    PhaseResult::Failed { request_id, error } => tracing::warn!(
                        plan_id = %step.id,
                        step = index,
                        phase = %phase,
                        request_id = %request_id,
                        error = %error,
                        "auto-start phase failed"
                    ),
                    PhaseResult::Aborted { error } => tracing::warn!(
                        plan_id = %step.id,
                        step = index,
                        phase = %phase,
                        error = %error,
                        "auto-start phase aborted"
                    ),
                    _ => {}
                }
                skip_rest = self.config.on_phase_failure.skips_after(&result);
                report.phases.push(PhaseRecord { phase, result });

                Self::pause(prefs.auto_progress_delay, &cancel).await;
            }

            report.auto_completed = true;
            reports.push(report);
            self.publish(|s| {
                s.auto_completed.push(step.id);
                s.status = RunnerStatus::Running {
                    step: index,
                    phase: None,
                };
            });

            let is_last = index + 1 == steps.len();
            if prefs.pause_between_steps && !is_last {
                Self::pause(self.config.step_pause, &cancel).await;
            }
        }

        // A stop during the last step's phases is only seen here.
        if outcome == RunOutcome::Completed && cancel.is_cancelled() {
            outcome = RunOutcome::Stopped;
        }

        if outcome == RunOutcome::Stopped {
            tracing::info!(
                steps_entered = reports.len(),
                "auto-start run stopped"
            );
            self.publish(|s| {
                s.status = RunnerStatus::Stopped;
                s.stopped = true;
            });
        }

        let summary = RunSummary {
            outcome,
            steps: reports,
        };
        tracing::info!(
            outcome = ?summary.outcome,
            recorder_calls = summary.recorder_calls(),
            failed_phases = summary.failed_phases(),
            "auto-start run finished"
        );

        self.publish(|s| s.status = RunnerStatus::Idle);
        summary
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use waypoint_db::models::{Priority, StepStatus};

    use super::*;

    fn step(title: &str) -> TaskPlan {
        TaskPlan {
            id: Uuid::new_v4(),
            goal_id: Uuid::new_v4(),
            title: title.to_owned(),
            description: "Research your target market".to_owned(),
            position: 0,
            estimated_duration: "2-3 weeks".to_owned(),
            priority: Priority::High,
            status: StepStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn synthesized_inputs() {
        let s = step("Market Research & Validation!!");
        assert_eq!(
            research_query(&s, ResearchDepth::Comprehensive),
            "Market Research & Validation!! (comprehensive research)"
        );
        assert_eq!(
            execution_instructions(&s, ExecutionType::ApiCall),
            "Market Research & Validation!!: Research your target market [mode: api_call]"
        );
        assert_eq!(
            deployment_configuration(&s, DeploymentProvider::GithubPages),
            json!({
                "provider": "github_pages",
                "project_name": "market-research---validation--"
            })
        );
    }

    #[test]
    fn enabled_phases_keep_workflow_order() {
        let prefs = AutoStartPreferences {
            execution: false,
            ..Default::default()
        };
        assert_eq!(
            prefs.enabled_phases(),
            vec![AgentDomain::Research, AgentDomain::Deployment]
        );
        assert_eq!(AutoStartPreferences::default().enabled_phases().len(), 3);
    }

    #[test]
    fn input_for_uses_preferences() {
        let prefs = AutoStartPreferences {
            execution_mode: ExecutionType::FileCreation,
            ..Default::default()
        };
        let input = prefs.input_for(AgentDomain::Execution, &step("Launch"));
        assert_eq!(
            input,
            RequestInput::Execution {
                execution_type: ExecutionType::FileCreation,
                instructions: "Launch: Research your target market [mode: file_creation]"
                    .to_owned(),
            }
        );
    }

    #[test]
    fn defaults() {
        let prefs = AutoStartPreferences::default();
        assert_eq!(prefs.auto_progress_delay, Duration::from_secs(2));
        assert!(prefs.pause_between_steps);
        let config = RunnerConfig::default();
        assert_eq!(config.step_pause, Duration::from_secs(2));
        assert_eq!(config.on_phase_failure, PhaseFailurePolicy::SkipStep);
    }

    #[test]
    fn failure_policies() {
        let failed = PhaseResult::Failed {
            request_id: Uuid::new_v4(),
            error: "generation failed".to_owned(),
        };
        let aborted = PhaseResult::Aborted {
            error: "failed to create research request".to_owned(),
        };
        let done = PhaseResult::Completed {
            request_id: Uuid::new_v4(),
        };

        assert!(!PhaseFailurePolicy::SkipStep.skips_after(&failed));
        assert!(PhaseFailurePolicy::SkipStep.skips_after(&aborted));
        assert!(PhaseFailurePolicy::SkipStepOnAnyFailure.skips_after(&failed));
        assert!(PhaseFailurePolicy::SkipStepOnAnyFailure.skips_after(&aborted));
        assert!(!PhaseFailurePolicy::ContinueStep.skips_after(&aborted));
        for policy in [
            PhaseFailurePolicy::SkipStep,
            PhaseFailurePolicy::SkipStepOnAnyFailure,
            PhaseFailurePolicy::ContinueStep,
        ] {
            assert!(!policy.skips_after(&done));
        }
        assert!(failed.is_failure() && aborted.is_failure() && !done.is_failure());
    }

    #[test]
    fn state_accessors() {
        let state = RunnerState {
            status: RunnerStatus::Running {
                step: 3,
                phase: Some(AgentDomain::Execution),
            },
            ..Default::default()
        };
        assert_eq!(state.current_step(), Some(3));
        assert_eq!(state.current_phase(), Some(AgentDomain::Execution));
        assert!(state.is_running());
        assert_eq!(RunnerState::default().current_step(), None);
    }
}
