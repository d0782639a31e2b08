use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use cycle_supervisor::{
    init_telemetry, supervisor_metrics, ProcessCommandExecutor, RetryingEngine, RocotoEngine,
    ShutdownCoordinator, Supervisor, SupervisorConfig, WorkflowEngine,
};

#[derive(Parser)]
#[command(name = "cycle-supervisor")]
#[command(about = "Boot a workflow cycle and keep its workflow engine advancing")]
#[command(long_about = "Runs the workflow engine once to make sure its state store exists, \
                       cold-starts one cycle/task list, then re-runs the engine at a fixed \
                       interval so queued and dependent tasks keep moving. Stops on the first \
                       engine failure or on SIGINT/SIGTERM.")]
struct Cli {
    /// Configuration file (defaults to ./cycle-supervisor.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directives (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    target: TargetArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct EngineArgs {
    /// Workflow definition file
    #[arg(long, global = true)]
    workflow: Option<PathBuf>,

    /// Engine state database
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Path to the rocotorun executable
    #[arg(long, global = true)]
    rocotorun: Option<String>,

    /// Path to the rocotoboot executable
    #[arg(long, global = true)]
    rocotoboot: Option<String>,

    /// Path to the rocotostat executable
    #[arg(long, global = true)]
    rocotostat: Option<String>,
}

/// What `run` and `boot` cold-start, and how often `run` polls. Global so
/// they also work without naming the default `run` subcommand.
#[derive(Args)]
struct TargetArgs {
    /// Cycle to cold-start
    #[arg(long, global = true)]
    cycle: Option<String>,

    /// Task list to boot within the cycle
    #[arg(long, global = true)]
    task_list: Option<String>,

    /// Seconds between polls
    #[arg(long, global = true)]
    interval: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize, boot the cycle, then keep synchronizing (default)
    Run,
    /// Synchronize the engine once and exit
    Sync,
    /// Boot the cycle/task list once and exit
    Boot,
    /// Print the engine's task status table
    Status,
    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(long, default_value = "cycle-supervisor.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::InitConfig { path, force }) = &cli.command {
        return init_config_command(path, *force);
    }

    let loaded_env_file = SupervisorConfig::load_env_file()?;
    let mut config = SupervisorConfig::load(cli.config.as_deref())?;
    apply_overrides(&cli, &mut config);
    config.validate()?;

    init_telemetry(&config.observability.log_level, config.observability.json_logs)?;
    if loaded_env_file {
        info!("Loaded environment variables from .env file");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        None | Some(Commands::Run) => runtime.block_on(run_command(&config)),
        Some(Commands::Sync) => runtime.block_on(sync_command(&config)),
        Some(Commands::Boot) => runtime.block_on(boot_command(&config)),
        Some(Commands::Status) => runtime.block_on(status_command(&config)),
        Some(Commands::InitConfig { .. }) => Ok(()),
    }
}

/// Command-line flags win over file and environment configuration.
fn apply_overrides(cli: &Cli, config: &mut SupervisorConfig) {
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    if cli.json_logs {
        config.observability.json_logs = true;
    }

    let engine = &cli.engine;
    if let Some(workflow) = &engine.workflow {
        config.engine.workflow = workflow.clone();
    }
    if let Some(database) = &engine.database {
        config.engine.database = database.clone();
    }
    if let Some(rocotorun) = &engine.rocotorun {
        config.engine.rocotorun = rocotorun.clone();
    }
    if let Some(rocotoboot) = &engine.rocotoboot {
        config.engine.rocotoboot = rocotoboot.clone();
    }
    if let Some(rocotostat) = &engine.rocotostat {
        config.engine.rocotostat = rocotostat.clone();
    }

    let target = &cli.target;
    if let Some(cycle) = &target.cycle {
        config.supervisor.cycle = cycle.clone();
    }
    if let Some(task_list) = &target.task_list {
        config.supervisor.task_list = task_list.clone();
    }
    if let Some(secs) = target.interval {
        config.supervisor.poll_interval_secs = secs;
    }
}

fn build_engine(config: &SupervisorConfig) -> RetryingEngine<RocotoEngine<ProcessCommandExecutor>> {
    RetryingEngine::new(
        RocotoEngine::new(config.command_executor(), config.rocoto_paths()),
        config.retry_policy(),
    )
}

async fn run_command(config: &SupervisorConfig) -> Result<()> {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    info!(
        host = %host,
        workflow = %config.engine.workflow.display(),
        database = %config.engine.database.display(),
        "cycle-supervisor starting"
    );

    let shutdown = ShutdownCoordinator::install()?;
    let mut supervisor = Supervisor::new(build_engine(config), config.supervisor_settings());

    let result = supervisor.run(shutdown).await;
    supervisor_metrics().log_stats();

    let summary = result?;
    info!(
        polls = summary.polls,
        phase = %summary.phase,
        uptime_secs = (summary.stopped_at - summary.started_at).num_seconds(),
        "Supervisor stopped"
    );
    Ok(())
}

async fn sync_command(config: &SupervisorConfig) -> Result<()> {
    build_engine(config).synchronize().await?;
    info!("Engine synchronized");
    Ok(())
}

async fn boot_command(config: &SupervisorConfig) -> Result<()> {
    let settings = config.supervisor_settings();
    build_engine(config)
        .boot(&settings.cycle, &settings.task_list)
        .await?;
    info!(cycle = %settings.cycle, task_list = %settings.task_list, "Cycle booted");
    Ok(())
}

async fn status_command(config: &SupervisorConfig) -> Result<()> {
    let engine = build_engine(config);
    let table = engine.inner().status().await?;
    print!("{table}");
    Ok(())
}

fn init_config_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    SupervisorConfig::default().save_to_file(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
