//! CLI handlers for one-off agent invocations and request history.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;

use waypoint_core::agent::{
    AgentDomain, AgentOutcome, AgentRecorder, AgentRun, ContentGenerator, Recorder,
    RequestInput, ResultPayload,
};
use waypoint_core::runner::{deployment_configuration, execution_instructions, research_query};
use waypoint_core::store::Store;
use waypoint_core::templates::ResearchDepth;
use waypoint_db::models::{DeploymentProvider, ExecutionType, TaskPlan};

use crate::goal_cmds::parse_id;

/// One agent invocation requested from the command line.
#[derive(Debug, Clone)]
pub enum AgentCommand {
    Research {
        query: Option<String>,
        depth: ResearchDepth,
    },
    Execute {
        mode: ExecutionType,
        instructions: Option<String>,
    },
    Deploy {
        provider: DeploymentProvider,
        project_name: Option<String>,
    },
}

impl AgentCommand {
    /// Build the recorder input, deriving anything not given from the step.
    pub fn input_for(&self, step: &TaskPlan) -> RequestInput {
        match self {
            Self::Research { query, depth } => RequestInput::Research {
                query: query
                    .clone()
                    .unwrap_or_else(|| research_query(step, *depth)),
            },
            Self::Execute { mode, instructions } => RequestInput::Execution {
                execution_type: *mode,
                instructions: instructions
                    .clone()
                    .unwrap_or_else(|| execution_instructions(step, *mode)),
            },
            Self::Deploy {
                provider,
                project_name,
            } => {
                let mut configuration = deployment_configuration(step, *provider);
                if let (Some(name), Value::Object(map)) = (project_name, &mut configuration) {
                    map.insert("project_name".into(), Value::String(name.clone()));
                }
                RequestInput::Deployment {
                    provider: *provider,
                    configuration,
                }
            }
        }
    }
}

/// Run one agent against a plan step and print what it produced.
pub async fn run_agent_command(
    store: Arc<dyn Store>,
    generator: Arc<dyn ContentGenerator>,
    plan_id: &str,
    command: AgentCommand,
) -> Result<AgentRun> {
    let plan_id = parse_id("plan step", plan_id)?;
    let step = store
        .get_plan(plan_id)
        .await?
        .with_context(|| format!("plan step {plan_id} not found"))?;

    let input = command.input_for(&step);
    println!("Running {} agent for \"{}\"...", input.domain(), step.title);

    let recorder = AgentRecorder::new(store, generator);
    let run = recorder.record(plan_id, input).await?;
    print_run(&run);
    Ok(run)
}

/// Print a request, its terminal status and every result row.
pub fn print_run(run: &AgentRun) {
    println!();
    println!("  Request: {} ({})", run.request.id, run.request.status);

    match &run.outcome {
        AgentOutcome::Completed(_) => {}
        AgentOutcome::Degraded { error, .. } => {
            println!("  Generation failed ({error}); showing fallback content.");
        }
        AgentOutcome::Failed { error } => {
            println!("  Failed: {error}");
        }
    }

    for (i, result) in run.outcome.results().iter().enumerate() {
        print_payload(i + 1, &result.payload);
        if !result.is_persisted() {
            println!("     (not saved)");
        }
    }
}

fn print_payload(n: usize, payload: &ResultPayload) {
    match payload {
        ResultPayload::Research(finding) => {
            println!(
                "  {n}. {} [relevance {:.2}]",
                finding.title, finding.relevance_score
            );
            println!("     {}", finding.summary);
        }
        ResultPayload::Execution(output) => {
            let target = output.file_path.as_deref().unwrap_or("-");
            println!("  {n}. {} -> {target}", output.output_type);
            for line in output.content.lines().take(8) {
                println!("     | {line}");
            }
        }
        ResultPayload::Deployment(outcome) => {
            let status = if outcome.success { "live" } else { "failed" };
            println!("  {n}. deployment {status}");
            if let Some(url) = &outcome.deployment_url {
                println!("     url:   {url}");
            }
            if let Some(url) = &outcome.claim_url {
                println!("     claim: {url}");
            }
            for line in outcome.logs.lines() {
                println!("     | {line}");
            }
        }
    }
}

// -----------------------------------------------------------------------
// waypoint history
// -----------------------------------------------------------------------

/// Print the agent requests recorded for a plan step, oldest first per domain.
pub async fn run_history(
    store: &dyn Store,
    plan_id: &str,
    domain: Option<AgentDomain>,
) -> Result<()> {
    let plan_id = parse_id("plan step", plan_id)?;
    let step = store
        .get_plan(plan_id)
        .await?
        .with_context(|| format!("plan step {plan_id} not found"))?;

    println!("History for \"{}\" ({})", step.title, step.id);

    let domains: Vec<AgentDomain> = match domain {
        Some(d) => vec![d],
        None => AgentDomain::ALL.to_vec(),
    };

    for domain in domains {
        let requests = store.list_requests(plan_id, domain).await?;
        println!();
        println!("{domain} ({} requests)", requests.len());
        for request in &requests {
            let results = store.list_results(domain, request.id).await?;
            println!(
                "  {} {:<11} {} results  {}",
                request.created_at.format("%Y-%m-%d %H:%M:%S"),
                request.status.to_string(),
                results.len(),
                describe_input(&request.input),
            );
        }
    }

    Ok(())
}

fn describe_input(input: &RequestInput) -> String {
    match input {
        RequestInput::Research { query } => query.clone(),
        RequestInput::Execution { execution_type, .. } => execution_type.to_string(),
        RequestInput::Deployment {
            provider,
            configuration,
        } => {
            let project = configuration
                .get("project_name")
                .and_then(Value::as_str)
                .unwrap_or("?");
            format!("{provider} {project}")
        }
    }
}

/// Parse an agent domain name for clap.
pub fn parse_domain(input: &str) -> Result<AgentDomain, String> {
    AgentDomain::ALL
        .into_iter()
        .find(|d| d.to_string() == input)
        .ok_or_else(|| format!("unknown agent domain {input:?} (research, execution, deployment)"))
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;
    use waypoint_core::agent::TemplateGenerator;
    use waypoint_core::goal::expand_goal;
    use waypoint_core::store::MemoryStore;
    use waypoint_db::models::RequestStatus;

    use super::*;

    async fn setup() -> (Arc<MemoryStore>, TaskPlan) {
        let store = Arc::new(MemoryStore::new(Uuid::new_v4()));
        let expanded = expand_goal(store.as_ref(), "Start a business").await.unwrap();
        (store, expanded.steps[0].plan.clone())
    }

    #[test]
    fn derived_inputs_follow_the_step() {
        let step = TaskPlan {
            id: Uuid::new_v4(),
            goal_id: Uuid::new_v4(),
            title: "Launch & Marketing".into(),
            description: "Go to market.".into(),
            position: 4,
            estimated_duration: "2 weeks".into(),
            priority: waypoint_db::models::Priority::High,
            status: waypoint_db::models::StepStatus::Pending,
            created_at: chrono::Utc::now(),
        };

        let research = AgentCommand::Research {
            query: None,
            depth: ResearchDepth::Basic,
        };
        assert_eq!(
            research.input_for(&step),
            RequestInput::Research {
                query: "Launch & Marketing (basic research)".into()
            }
        );

        let deploy = AgentCommand::Deploy {
            provider: DeploymentProvider::Netlify,
            project_name: Some("my-site".into()),
        };
        let RequestInput::Deployment { configuration, .. } = deploy.input_for(&step) else {
            panic!("expected deployment input");
        };
        assert_eq!(configuration["project_name"], "my-site");
        assert_eq!(configuration["provider"], "netlify");
    }

    #[tokio::test]
    async fn research_command_records_completed_request() {
        let (store, step) = setup().await;
        let run = run_agent_command(
            store.clone(),
            Arc::new(TemplateGenerator::instant()),
            &step.id.to_string(),
            AgentCommand::Research {
                query: None,
                depth: ResearchDepth::Comprehensive,
            },
        )
        .await
        .unwrap();

        assert_eq!(run.request.status, RequestStatus::Completed);
        assert_eq!(run.outcome.results().len(), 4);
        run_history(store.as_ref(), &step.id.to_string(), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_plan_step_is_reported() {
        let (store, _) = setup().await;
        let missing = Uuid::new_v4();
        let err = run_agent_command(
            store,
            Arc::new(TemplateGenerator::instant()),
            &missing.to_string(),
            AgentCommand::Execute {
                mode: ExecutionType::ApiCall,
                instructions: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), format!("plan step {missing} not found"));
    }

    #[test]
    fn parse_domain_accepts_display_names() {
        assert_eq!(parse_domain("execution"), Ok(AgentDomain::Execution));
        assert!(parse_domain("build").is_err());
    }
}
