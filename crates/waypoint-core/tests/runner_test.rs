//! Workflow runner behaviour against a scripted recorder.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use waypoint_core::agent::{
    AgentDomain, AgentInvocationError, AgentOutcome, AgentRecorder, AgentRequest, AgentRun,
    ContentError, ContentGenerator, Recorder, RequestInput, ResultPayload, TemplateGenerator,
};
use waypoint_core::goal::expand_goal;
use waypoint_core::runner::{
    AutoStartPreferences, PhaseFailurePolicy, PhaseResult, RunOutcome, RunnerConfig, RunnerStatus,
    WorkflowRunner,
};
use waypoint_core::store::{MemoryStore, Store};
use waypoint_db::models::{Priority, RequestStatus, StepStatus, TaskPlan};

/// How the scripted recorder answers a given call.
#[derive(Clone, Copy)]
enum Script {
    Complete,
    /// Return `AgentOutcome::Failed`.
    Fail,
    /// Return `Err(RequestCreation)`.
    Reject,
    /// Cancel the token, then complete.
    CancelThenComplete,
}

/// Records every call and answers according to a script.
struct ScriptedRecorder {
    calls: Mutex<Vec<(Uuid, AgentDomain)>>,
    script: Box<dyn Fn(usize, AgentDomain) -> Script + Send + Sync>,
    cancel: CancellationToken,
}

impl ScriptedRecorder {
    fn new(
        cancel: CancellationToken,
        script: impl Fn(usize, AgentDomain) -> Script + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            script: Box::new(script),
            cancel,
        }
    }

    fn always_complete() -> Self {
        Self::new(CancellationToken::new(), |_, _| Script::Complete)
    }

    fn calls(&self) -> Vec<(Uuid, AgentDomain)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recorder for ScriptedRecorder {
    async fn record(
        &self,
        plan_id: Uuid,
        input: RequestInput,
    ) -> Result<AgentRun, AgentInvocationError> {
        let domain = input.domain();
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((plan_id, domain));
            calls.len() - 1
        };

        let request = |status| AgentRequest {
            id: Uuid::new_v4(),
            plan_id,
            input: input.clone(),
            status,
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
        };

        match (self.script)(index, domain) {
            Script::Complete => Ok(AgentRun {
                request: request(RequestStatus::Completed),
                outcome: AgentOutcome::Completed(Vec::new()),
            }),
            Script::CancelThenComplete => {
                self.cancel.cancel();
                Ok(AgentRun {
                    request: request(RequestStatus::Completed),
                    outcome: AgentOutcome::Completed(Vec::new()),
                })
            }
            Script::Fail => Ok(AgentRun {
                request: request(RequestStatus::Failed),
                outcome: AgentOutcome::Failed {
                    error: ContentError::Generation("scripted failure".into()),
                },
            }),
            Script::Reject => Err(AgentInvocationError::RequestCreation {
                domain,
                plan_id,
                source: "scripted rejection".into(),
            }),
        }
    }
}

fn steps(n: usize) -> Vec<TaskPlan> {
    (0..n)
        .map(|i| TaskPlan {
            id: Uuid::new_v4(),
            goal_id: Uuid::nil(),
            title: format!("Step {i}"),
            description: format!("Do step {i}"),
            position: i as i32,
            estimated_duration: "1 week".into(),
            priority: Priority::Medium,
            status: StepStatus::Pending,
            created_at: Utc::now(),
        })
        .collect()
}

fn runner(recorder: Arc<dyn Recorder>, policy: PhaseFailurePolicy) -> WorkflowRunner {
    WorkflowRunner::new(
        recorder,
        RunnerConfig {
            step_pause: Duration::from_secs(2),
            on_phase_failure: policy,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn calls_are_step_major_phase_minor() {
    let recorder = Arc::new(ScriptedRecorder::always_complete());
    let plan = steps(3);
    let runner = runner(recorder.clone(), PhaseFailurePolicy::SkipStep);

    let summary = runner
        .run(&plan, &AutoStartPreferences::default(), CancellationToken::new())
        .await;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    let expected: Vec<(Uuid, AgentDomain)> = plan
        .iter()
        .flat_map(|s| AgentDomain::ALL.map(|d| (s.id, d)))
        .collect();
    assert_eq!(recorder.calls(), expected);
    assert_eq!(summary.recorder_calls(), 9);
    assert!(summary.steps.iter().all(|s| s.auto_completed));
}

#[tokio::test(start_paused = true)]
async fn disabled_phases_are_not_called() {
    let recorder = Arc::new(ScriptedRecorder::always_complete());
    let plan = steps(2);
    let prefs = AutoStartPreferences {
        research: false,
        deployment: false,
        ..Default::default()
    };

    runner(recorder.clone(), PhaseFailurePolicy::SkipStep)
        .run(&plan, &prefs, CancellationToken::new())
        .await;

    let domains: Vec<AgentDomain> = recorder.calls().into_iter().map(|(_, d)| d).collect();
    assert_eq!(domains, vec![AgentDomain::Execution, AgentDomain::Execution]);
}

#[tokio::test(start_paused = true)]
async fn skip_step_policy_skips_rest_of_aborted_step() {
    // Step 1's execution request cannot be created.
    let recorder = Arc::new(ScriptedRecorder::new(
        CancellationToken::new(),
        |index, _| if index == 4 { Script::Reject } else { Script::Complete },
    ));
    let plan = steps(3);

    let summary = runner(recorder.clone(), PhaseFailurePolicy::SkipStep)
        .run(&plan, &AutoStartPreferences::default(), CancellationToken::new())
        .await;

    let calls = recorder.calls();
    assert_eq!(calls.len(), 8);
    assert_eq!(calls[4], (plan[1].id, AgentDomain::Execution));
    assert_eq!(calls[5], (plan[2].id, AgentDomain::Research));

    let step1 = &summary.steps[1];
    assert!(step1.has_failure());
    assert!(matches!(step1.phases[1].result, PhaseResult::Aborted { .. }));
    assert_eq!(step1.phases[2].result, PhaseResult::Skipped);
    assert!(step1.auto_completed);
    assert_eq!(summary.failed_phases(), 1);
    assert_eq!(summary.outcome, RunOutcome::Completed);
}

#[tokio::test(start_paused = true)]
async fn skip_step_policy_carries_on_after_recorded_failure() {
    // Step 1's execution is recorded as failed; its deployment still runs.
    let recorder = Arc::new(ScriptedRecorder::new(
        CancellationToken::new(),
        |index, _| if index == 4 { Script::Fail } else { Script::Complete },
    ));
    let plan = steps(3);

    let summary = runner(recorder.clone(), PhaseFailurePolicy::SkipStep)
        .run(&plan, &AutoStartPreferences::default(), CancellationToken::new())
        .await;

    let calls = recorder.calls();
    assert_eq!(calls.len(), 9);
    assert_eq!(calls[5], (plan[1].id, AgentDomain::Deployment));

    let step1 = &summary.steps[1];
    assert!(matches!(step1.phases[1].result, PhaseResult::Failed { .. }));
    assert!(matches!(step1.phases[2].result, PhaseResult::Completed { .. }));
    assert_eq!(summary.failed_phases(), 1);
}

#[tokio::test(start_paused = true)]
async fn strict_policy_skips_rest_after_recorded_failure() {
    let recorder = Arc::new(ScriptedRecorder::new(
        CancellationToken::new(),
        |index, _| if index == 4 { Script::Fail } else { Script::Complete },
    ));
    let plan = steps(3);

    let summary = runner(recorder.clone(), PhaseFailurePolicy::SkipStepOnAnyFailure)
        .run(&plan, &AutoStartPreferences::default(), CancellationToken::new())
        .await;

    assert_eq!(recorder.calls().len(), 8);
    assert_eq!(summary.steps[1].phases[2].result, PhaseResult::Skipped);
}

#[tokio::test(start_paused = true)]
async fn continue_step_policy_runs_remaining_phases() {
    let recorder = Arc::new(ScriptedRecorder::new(
        CancellationToken::new(),
        |index, _| if index == 1 { Script::Reject } else { Script::Complete },
    ));
    let plan = steps(2);

    let summary = runner(recorder.clone(), PhaseFailurePolicy::ContinueStep)
        .run(&plan, &AutoStartPreferences::default(), CancellationToken::new())
        .await;

    assert_eq!(recorder.calls().len(), 6);
    let PhaseResult::Aborted { error } = &summary.steps[0].phases[1].result else {
        panic!("expected aborted execution phase");
    };
    assert!(error.contains("failed to create execution request"));
    assert!(matches!(
        summary.steps[0].phases[2].result,
        PhaseResult::Completed { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn every_step_failing_still_finishes_idle() {
    let recorder = Arc::new(ScriptedRecorder::new(CancellationToken::new(), |_, _| {
        Script::Reject
    }));
    let plan = steps(4);
    let runner = runner(recorder.clone(), PhaseFailurePolicy::SkipStep);

    let summary = runner
        .run(&plan, &AutoStartPreferences::default(), CancellationToken::new())
        .await;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.failed_phases(), 4);
    assert_eq!(runner.state().status, RunnerStatus::Idle);
    assert!(!runner.state().stopped);
}

#[tokio::test(start_paused = true)]
async fn cancellation_lets_in_flight_call_finish_then_stops() {
    let cancel = CancellationToken::new();
    // The second call (step 0 execution) cancels while in flight.
    let recorder = Arc::new(ScriptedRecorder::new(cancel.clone(), |index, _| {
        if index == 1 {
            Script::CancelThenComplete
        } else {
            Script::Complete
        }
    }));
    let plan = steps(3);
    let runner = runner(recorder.clone(), PhaseFailurePolicy::SkipStep);
    let mut rx = runner.subscribe();

    let summary = runner
        .run(&plan, &AutoStartPreferences::default(), cancel)
        .await;

    assert_eq!(summary.outcome, RunOutcome::Stopped);
    assert_eq!(recorder.calls().len(), 2);
    assert_eq!(summary.steps.len(), 1);
    assert!(matches!(
        summary.steps[0].phases[1].result,
        PhaseResult::Completed { .. }
    ));
    assert!(!summary.steps[0].auto_completed);

    let state = rx.borrow_and_update().clone();
    assert_eq!(state.status, RunnerStatus::Idle);
    assert!(state.stopped);
    assert!(state.auto_completed.is_empty());
    assert_eq!(state.started.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_last_phase_still_stops() {
    let cancel = CancellationToken::new();
    // Call 5 is the last step's deployment.
    let recorder = Arc::new(ScriptedRecorder::new(cancel.clone(), |index, _| {
        if index == 5 {
            Script::CancelThenComplete
        } else {
            Script::Complete
        }
    }));
    let plan = steps(2);
    let runner = Arc::new(runner(recorder.clone(), PhaseFailurePolicy::SkipStep));
    let mut rx = runner.subscribe();

    let handle = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            runner
                .run(&plan, &AutoStartPreferences::default(), cancel)
                .await
        })
    };

    let mut saw_stopped = false;
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        saw_stopped |= state.status == RunnerStatus::Stopped;
        if state.status == RunnerStatus::Idle {
            break;
        }
    }
    let summary = handle.await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Stopped);
    assert_eq!(recorder.calls().len(), 6);
    assert!(saw_stopped);
    let state = runner.state();
    assert_eq!(state.status, RunnerStatus::Idle);
    assert!(state.stopped);
}

#[tokio::test(start_paused = true)]
async fn cancel_before_start_makes_no_calls() {
    let recorder = Arc::new(ScriptedRecorder::always_complete());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = runner(recorder.clone(), PhaseFailurePolicy::SkipStep)
        .run(&steps(2), &AutoStartPreferences::default(), cancel)
        .await;

    assert_eq!(summary.outcome, RunOutcome::Stopped);
    assert!(recorder.calls().is_empty());
    assert!(summary.steps.is_empty());
}

#[tokio::test(start_paused = true)]
async fn delays_follow_phases_and_steps() {
    let recorder = Arc::new(ScriptedRecorder::always_complete());
    let prefs = AutoStartPreferences {
        auto_progress_delay: Duration::from_secs(1),
        ..Default::default()
    };
    let started = tokio::time::Instant::now();

    runner(recorder, PhaseFailurePolicy::SkipStep)
        .run(&steps(2), &prefs, CancellationToken::new())
        .await;

    // 2 steps x 3 phases x 1s, plus one 2s pause between the steps.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(8), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(9), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn no_pause_between_steps_when_disabled() {
    let recorder = Arc::new(ScriptedRecorder::always_complete());
    let prefs = AutoStartPreferences {
        auto_progress_delay: Duration::ZERO,
        pause_between_steps: false,
        ..Default::default()
    };
    let started = tokio::time::Instant::now();

    runner(recorder, PhaseFailurePolicy::SkipStep)
        .run(&steps(3), &prefs, CancellationToken::new())
        .await;

    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn runner_publishes_phase_transitions() {
    let recorder = Arc::new(ScriptedRecorder::always_complete());
    let runner = Arc::new(runner(recorder, PhaseFailurePolicy::SkipStep));
    let mut rx = runner.subscribe();
    let plan = steps(1);

    let handle = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            runner
                .run(&plan, &AutoStartPreferences::default(), CancellationToken::new())
                .await
        })
    };

    let mut seen = Vec::new();
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if let Some(phase) = state.current_phase() {
            if seen.last() != Some(&phase) {
                seen.push(phase);
            }
        }
        if state.status == RunnerStatus::Idle {
            break;
        }
    }
    handle.await.unwrap();

    assert_eq!(seen, AgentDomain::ALL.to_vec());
}

#[tokio::test(start_paused = true)]
async fn full_flow_against_memory_store() {
    let store = MemoryStore::new(Uuid::new_v4());
    let expanded = expand_goal(&store, "Learn web development in 6 months")
        .await
        .unwrap();
    let recorder = AgentRecorder::new(
        Arc::new(store.clone()),
        Arc::new(TemplateGenerator::instant()),
    );
    let runner = WorkflowRunner::new(Arc::new(recorder), RunnerConfig::default());

    let summary = runner
        .run(
            &expanded.plans(),
            &AutoStartPreferences::default(),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.failed_phases(), 0);
    for step in &expanded.steps {
        for domain in AgentDomain::ALL {
            let requests = store.list_requests(step.plan.id, domain).await.unwrap();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].status, RequestStatus::Completed);
        }
        // The runner leaves step status alone.
        let plan = store.get_plan(step.plan.id).await.unwrap().unwrap();
        assert_eq!(plan.status, StepStatus::Pending);
    }
}

/// Template content, except that execution always fails.
struct FailingExecution(TemplateGenerator);

#[async_trait]
impl ContentGenerator for FailingExecution {
    async fn generate(&self, input: &RequestInput) -> Result<Vec<ResultPayload>, ContentError> {
        match input {
            RequestInput::Execution { .. } => {
                Err(ContentError::Generation("build server unavailable".into()))
            }
            _ => self.0.generate(input).await,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn failed_execution_does_not_block_deployment() {
    let store = MemoryStore::new(Uuid::new_v4());
    let expanded = expand_goal(&store, "Start a coffee roasting business")
        .await
        .unwrap();
    let recorder = AgentRecorder::new(
        Arc::new(store.clone()),
        Arc::new(FailingExecution(TemplateGenerator::instant())),
    );
    let runner = WorkflowRunner::new(Arc::new(recorder), RunnerConfig::default());

    let summary = runner
        .run(
            &expanded.plans(),
            &AutoStartPreferences::default(),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.failed_phases(), expanded.steps.len());
    let first = &expanded.steps[0].plan;
    let executions = store
        .list_requests(first.id, AgentDomain::Execution)
        .await
        .unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, RequestStatus::Failed);
    let deployments = store
        .list_requests(first.id, AgentDomain::Deployment)
        .await
        .unwrap();
    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0].status, RequestStatus::Completed);
}
