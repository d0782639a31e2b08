use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::{CycleIdentifier, RetryPolicy, RocotoPaths, TaskListIdentifier};
use crate::external::ProcessCommandExecutor;
use crate::supervisor::{SupervisorSettings, DEFAULT_CYCLE, DEFAULT_POLL_INTERVAL, DEFAULT_TASK_LIST};

/// Base name of the configuration file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "cycle-supervisor";
/// Prefix of environment overrides, e.g. `CYCLE_SUPERVISOR__SUPERVISOR__POLL_INTERVAL_SECS`
pub const ENV_PREFIX: &str = "CYCLE_SUPERVISOR";

/// Main configuration structure for the cycle supervisor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// What to boot and how often to poll
    pub supervisor: LoopConfig,
    /// Workflow engine executables and files
    pub engine: EngineConfig,
    /// Backoff for transient engine failures
    pub retry: RetryConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Cycle to cold-start
    pub cycle: String,
    /// Task list booted within that cycle
    pub task_list: String,
    /// Seconds between polls
    pub poll_interval_secs: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            cycle: DEFAULT_CYCLE.to_string(),
            task_list: DEFAULT_TASK_LIST.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rocotorun: String,
    pub rocotoboot: String,
    pub rocotostat: String,
    /// Workflow definition (XML)
    pub workflow: PathBuf,
    /// Engine state database
    pub database: PathBuf,
    /// Engine log verbosity (`-v`)
    pub verbosity: Option<u8>,
    /// Directory engine commands run in
    pub working_dir: Option<PathBuf>,
    /// Kill an engine command after this many seconds; unset waits forever
    pub command_timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let paths = RocotoPaths::default();
        Self {
            rocotorun: paths.rocotorun,
            rocotoboot: paths.rocotoboot,
            rocotostat: paths.rocotostat,
            workflow: paths.workflow,
            database: paths.database,
            verbosity: paths.verbosity,
            working_dir: None,
            command_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per engine call; 1 means fail on the first error
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            jitter: policy.jitter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or filter directives; `RUST_LOG` takes precedence
    pub log_level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl SupervisorConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. `explicit` if given (must exist), else `cycle-supervisor.toml` if present
    /// 3. Environment variables (`CYCLE_SUPERVISOR__<SECTION>__<KEY>`)
    ///
    /// Not validated here: command-line overrides go on top first, then
    /// `validate` runs on the result.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Configuration file {} does not exist", path.display());
                }
                builder.add_source(File::from(path).required(true))
            }
            None => builder.add_source(File::with_name(CONFIG_FILE_NAME).required(false)),
        };

        // No type guessing: cycle tags like "0600" must survive as strings.
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(false),
        );

        builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn validate(&self) -> Result<()> {
        if self.supervisor.poll_interval_secs == 0 {
            bail!("supervisor.poll_interval_secs must be greater than zero");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            bail!("retry.base_delay_ms must not exceed retry.max_delay_ms");
        }
        if self.engine.workflow.as_os_str().is_empty() {
            bail!("engine.workflow must be set");
        }
        if self.engine.database.as_os_str().is_empty() {
            bail!("engine.database must be set");
        }
        if self.engine.command_timeout_secs == Some(0) {
            bail!("engine.command_timeout_secs must be greater than zero when set");
        }
        Ok(())
    }

    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            cycle: CycleIdentifier::from(self.supervisor.cycle.as_str()),
            task_list: TaskListIdentifier::from(self.supervisor.task_list.as_str()),
            poll_interval: Duration::from_secs(self.supervisor.poll_interval_secs),
        }
    }

    pub fn rocoto_paths(&self) -> RocotoPaths {
        RocotoPaths {
            rocotorun: self.engine.rocotorun.clone(),
            rocotoboot: self.engine.rocotoboot.clone(),
            rocotostat: self.engine.rocotostat.clone(),
            workflow: self.engine.workflow.clone(),
            database: self.engine.database.clone(),
            verbosity: self.engine.verbosity,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            jitter: self.retry.jitter,
        }
    }

    pub fn command_executor(&self) -> ProcessCommandExecutor {
        let mut executor = ProcessCommandExecutor::new();
        if let Some(dir) = &self.engine.working_dir {
            executor = executor.with_working_dir(dir);
        }
        if let Some(secs) = self.engine.command_timeout_secs {
            executor = executor.with_timeout(Duration::from_secs(secs));
        }
        executor
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists. Variables already set in the
    /// environment are left alone. Returns whether a file was read.
    pub fn load_env_file() -> Result<bool> {
        if !Path::new(".env").exists() {
            return Ok(false);
        }
        dotenvy::dotenv().context("Failed to read .env file")?;
        Ok(true)
    }
}
