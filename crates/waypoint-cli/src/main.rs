mod agent_cmds;
mod config;
mod demo_cmd;
mod goal_cmds;
mod run_cmd;

#[cfg(test)]
mod test_util;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::PgPool;
use uuid::Uuid;

use waypoint_core::agent::{AgentDomain, ContentGenerator, LatencyConfig, TemplateGenerator};
use waypoint_core::store::{PgStore, Store};
use waypoint_core::templates::ResearchDepth;
use waypoint_db::models::{DeploymentProvider, ExecutionType, StepStatus};
use waypoint_db::pool;

use agent_cmds::AgentCommand;
use config::WaypointConfig;
use run_cmd::RunArgs;

#[derive(Parser)]
#[command(name = "waypoint", about = "Turn goals into plans and run simulated agents on them")]
struct Cli {
    /// Database URL (overrides WAYPOINT_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Acting user (overrides WAYPOINT_USER_ID env var)
    #[arg(long, global = true)]
    user_id: Option<Uuid>,

    /// Skip the simulated agent latency
    #[arg(long, global = true)]
    instant: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a waypoint config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = "postgresql://localhost:5432/waypoint")]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Initialize the waypoint database (requires config file or env vars)
    DbInit,
    /// Goal management
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Plan step management
    Step {
        #[command(subcommand)]
        command: StepCommands,
    },
    /// Sub-task checklist management
    Subtask {
        #[command(subcommand)]
        command: SubtaskCommands,
    },
    /// Run the research agent on a plan step
    Research {
        /// Plan step ID
        plan_id: String,
        /// Query (defaults to the step title)
        #[arg(long)]
        query: Option<String>,
        /// Research depth: basic, standard, comprehensive
        #[arg(long, default_value_t = ResearchDepth::Standard)]
        depth: ResearchDepth,
    },
    /// Run the execution agent on a plan step
    Execute {
        /// Plan step ID
        plan_id: String,
        /// Execution mode: code_generation, script_execution, api_call, file_creation
        #[arg(long, default_value_t = ExecutionType::CodeGeneration)]
        mode: ExecutionType,
        /// Instructions (default derived from the step)
        #[arg(long)]
        instructions: Option<String>,
    },
    /// Run the deployment agent on a plan step
    Deploy {
        /// Plan step ID
        plan_id: String,
        /// Provider: vercel, netlify, github_pages
        #[arg(long, default_value_t = DeploymentProvider::Vercel)]
        provider: DeploymentProvider,
        /// Project name (defaults to a slug of the step title)
        #[arg(long)]
        project_name: Option<String>,
    },
    /// Show agent requests recorded for a plan step
    History {
        /// Plan step ID
        plan_id: String,
        /// Only this domain: research, execution, deployment
        #[arg(long, value_parser = agent_cmds::parse_domain)]
        domain: Option<AgentDomain>,
    },
    /// Auto-start every step of a goal
    Run {
        /// Goal ID
        goal_id: String,
        #[command(flatten)]
        args: RunArgs,
    },
    /// Run the whole flow in memory (no database required)
    Demo {
        /// Goal text
        #[arg(default_value = "Start a coffee roasting business")]
        goal: String,
        /// Keep simulated latency and phase delays
        #[arg(long)]
        realtime: bool,
    },
}

#[derive(Subcommand)]
pub enum GoalCommands {
    /// Create a goal and expand it into plan steps
    Create {
        /// Goal text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// List your goals
    List,
    /// Show a goal's plan steps and sub-tasks
    Show {
        /// Goal ID
        goal_id: String,
    },
}

#[derive(Subcommand)]
pub enum StepCommands {
    /// Set a plan step's status
    Status {
        /// Plan step ID
        plan_id: String,
        /// New status: pending, in_progress, completed
        status: StepStatus,
    },
}

#[derive(Subcommand)]
pub enum SubtaskCommands {
    /// Flip a sub-task between done and open
    Toggle {
        /// Sub-task ID
        sub_task_id: String,
    },
}

/// Execute the `waypoint init` command: write config file.
fn cmd_init(db_url: &str, user_id: Option<Uuid>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let user_id = user_id.unwrap_or_else(Uuid::new_v4);
    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        user: config::UserSection { id: user_id },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  user.id = {user_id}");
    println!();
    println!("Next: run `waypoint db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `waypoint db-init` command: create database and run migrations.
async fn cmd_db_init(resolved: &WaypointConfig) -> anyhow::Result<()> {
    println!("Initializing waypoint database...");

    // 1. Create the database if it does not exist.
    pool::ensure_database_exists(&resolved.db_config).await?;

    // 2. Connect to the target database.
    let db_pool = pool::create_pool(&resolved.db_config).await?;

    // 3. Run migrations.
    pool::run_migrations(&db_pool).await?;

    // 4. Print success with table counts.
    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    // 5. Clean shutdown.
    db_pool.close().await;

    println!("waypoint db-init complete.");
    Ok(())
}

/// Connect and scope a store to the resolved user.
async fn open_store(resolved: &WaypointConfig) -> anyhow::Result<(PgPool, Arc<dyn Store>)> {
    let user_id = resolved.require_user()?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    let store: Arc<dyn Store> = Arc::new(PgStore::new(db_pool.clone(), user_id));
    Ok((db_pool, store))
}

fn generator(instant: bool) -> Arc<dyn ContentGenerator> {
    let latency = if instant {
        LatencyConfig::zero()
    } else {
        LatencyConfig::default()
    };
    Arc::new(TemplateGenerator::new(latency))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Commands that need neither a database nor a resolved config.
    match &cli.command {
        Commands::Init { db_url, force } => return cmd_init(db_url, cli.user_id, *force),
        Commands::Demo { goal, realtime } => {
            demo_cmd::run_demo(goal, *realtime).await?;
            return Ok(());
        }
        _ => {}
    }

    let resolved = WaypointConfig::resolve(cli.database_url.as_deref(), cli.user_id)?;

    if let Commands::DbInit = cli.command {
        return cmd_db_init(&resolved).await;
    }

    let (db_pool, store) = open_store(&resolved).await?;

    let result = match cli.command {
        Commands::Goal { command } => goal_cmds::run_goal_command(command, store.as_ref()).await,
        Commands::Step { command } => goal_cmds::run_step_command(command, store.as_ref()).await,
        Commands::Subtask { command } => {
            goal_cmds::run_subtask_command(command, store.as_ref()).await
        }
        Commands::Research {
            plan_id,
            query,
            depth,
        } => agent_cmds::run_agent_command(
            store,
            generator(cli.instant),
            &plan_id,
            AgentCommand::Research { query, depth },
        )
        .await
        .map(drop),
        Commands::Execute {
            plan_id,
            mode,
            instructions,
        } => agent_cmds::run_agent_command(
            store,
            generator(cli.instant),
            &plan_id,
            AgentCommand::Execute { mode, instructions },
        )
        .await
        .map(drop),
        Commands::Deploy {
            plan_id,
            provider,
            project_name,
        } => agent_cmds::run_agent_command(
            store,
            generator(cli.instant),
            &plan_id,
            AgentCommand::Deploy {
                provider,
                project_name,
            },
        )
        .await
        .map(drop),
        Commands::History { plan_id, domain } => {
            agent_cmds::run_history(store.as_ref(), &plan_id, domain).await
        }
        Commands::Run { goal_id, args } => {
            run_cmd::run_auto_start(store, generator(cli.instant), &goal_id, &args).await
        }
        Commands::Init { .. } | Commands::DbInit | Commands::Demo { .. } => Ok(()),
    };

    db_pool.close().await;
    result
}
