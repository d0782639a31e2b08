//! Rocoto command-line adapter
//!
//! Translates the two engine operations into `rocotorun` / `rocotoboot`
//! invocations against one workflow definition and its state database.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, Instrument};

use crate::engine::{CycleIdentifier, EngineError, TaskListIdentifier, WorkflowEngine};
use crate::external::{CommandExecutor, CommandOutput};
use crate::observability::OperationTimer;
use crate::telemetry::{create_engine_span, generate_correlation_id};

/// Where the engine's executables and files live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RocotoPaths {
    pub rocotorun: String,
    pub rocotoboot: String,
    pub rocotostat: String,
    /// Workflow definition (XML)
    pub workflow: PathBuf,
    /// Engine state database; created by the first `rocotorun`
    pub database: PathBuf,
    /// Passed as `-v`; the engine's default when unset
    pub verbosity: Option<u8>,
}

impl Default for RocotoPaths {
    fn default() -> Self {
        Self {
            rocotorun: "rocotorun".to_string(),
            rocotoboot: "rocotoboot".to_string(),
            rocotostat: "rocotostat".to_string(),
            workflow: PathBuf::from("workflow.xml"),
            database: PathBuf::from("workflow.db"),
            verbosity: None,
        }
    }
}

pub struct RocotoEngine<X: CommandExecutor> {
    executor: X,
    paths: RocotoPaths,
}

impl<X: CommandExecutor> RocotoEngine<X> {
    pub fn new(executor: X, paths: RocotoPaths) -> Self {
        Self { executor, paths }
    }

    pub fn paths(&self) -> &RocotoPaths {
        &self.paths
    }

    fn workflow_args(&self) -> Vec<String> {
        vec![
            "-w".to_string(),
            self.paths.workflow.display().to_string(),
            "-d".to_string(),
            self.paths.database.display().to_string(),
        ]
    }

    fn with_verbosity(&self, mut args: Vec<String>) -> Vec<String> {
        if let Some(level) = self.paths.verbosity {
            args.push("-v".to_string());
            args.push(level.to_string());
        }
        args
    }

    pub(crate) fn synchronize_args(&self) -> Vec<String> {
        self.with_verbosity(self.workflow_args())
    }

    pub(crate) fn boot_args(&self, cycle: &CycleIdentifier, task_list: &TaskListIdentifier) -> Vec<String> {
        let mut args = self.workflow_args();
        args.push("-c".to_string());
        args.push(cycle.to_string());
        args.push("-t".to_string());
        args.push(task_list.to_string());
        self.with_verbosity(args)
    }

    /// Run `program` and turn a non-zero exit into `EngineError::CommandFailed`.
    async fn invoke(&self, program: &str, args: &[String]) -> Result<CommandOutput, EngineError> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self
            .executor
            .execute(program, &args)
            .await
            .map_err(|e| EngineError::from_command(program, e))?;

        if !output.stdout.trim().is_empty() {
            debug!(program = %program, stdout = %output.stdout.trim_end(), "Engine output");
        }
        if !output.stderr.trim().is_empty() {
            debug!(program = %program, stderr = %output.stderr.trim_end(), "Engine diagnostics");
        }

        if !output.success() {
            return Err(EngineError::CommandFailed {
                program: program.to_string(),
                status_code: output.status_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Current task table as printed by `rocotostat`.
    pub async fn status(&self) -> Result<String, EngineError> {
        let output = self
            .invoke(&self.paths.rocotostat, &self.workflow_args())
            .await?;
        Ok(output.stdout)
    }
}

#[async_trait]
impl<X: CommandExecutor> WorkflowEngine for RocotoEngine<X> {
    async fn synchronize(&self) -> Result<(), EngineError> {
        let span = create_engine_span("synchronize", &generate_correlation_id());
        async {
            let timer = OperationTimer::new("synchronize");
            let result = self
                .invoke(&self.paths.rocotorun, &self.synchronize_args())
                .await
                .map(|_| ());
            timer.finish();
            result
        }
        .instrument(span)
        .await
    }

    async fn boot(
        &self,
        cycle: &CycleIdentifier,
        task_list: &TaskListIdentifier,
    ) -> Result<(), EngineError> {
        let span = create_engine_span("boot", &generate_correlation_id());
        async {
            let timer = OperationTimer::new("boot");
            let result = self
                .invoke(&self.paths.rocotoboot, &self.boot_args(cycle, task_list))
                .await
                .map(|_| ());
            timer.finish();
            result
        }
        .instrument(span)
        .await
    }
}
