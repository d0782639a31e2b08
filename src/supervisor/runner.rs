//! The boot-then-poll control loop
//!
//! One synchronize to make sure the engine's state store exists, one cold
//! boot of the configured cycle/task list, then a synchronize after every
//! poll interval until shutdown is requested. The first engine error ends
//! the run and is handed back to the caller untouched.

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::engine::{CycleIdentifier, EngineError, TaskListIdentifier, WorkflowEngine};
use crate::observability::supervisor_metrics;
use crate::supervisor::state_machine::{PhaseEvent, PhaseTracker, SupervisorPhase};

/// Reference cycle booted when nothing else is configured.
pub const DEFAULT_CYCLE: &str = "201808121200";
/// Reference task list booted when nothing else is configured.
pub const DEFAULT_TASK_LIST: &str = "gsi";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Fixed for the lifetime of a supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    pub cycle: CycleIdentifier,
    pub task_list: TaskListIdentifier,
    /// Delay between the end of one synchronize and the start of the next
    pub poll_interval: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            cycle: CycleIdentifier::from(DEFAULT_CYCLE),
            task_list: TaskListIdentifier::from(DEFAULT_TASK_LIST),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What a run looked like when it was asked to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub polls: u64,
    pub phase: SupervisorPhase,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
}

pub struct Supervisor<E: WorkflowEngine> {
    engine: E,
    settings: SupervisorSettings,
    phases: PhaseTracker,
    polls: u64,
}

impl<E: WorkflowEngine> Supervisor<E> {
    pub fn new(engine: E, settings: SupervisorSettings) -> Self {
        Self {
            engine,
            settings,
            phases: PhaseTracker::new(),
            polls: 0,
        }
    }

    pub fn settings(&self) -> &SupervisorSettings {
        &self.settings
    }

    pub fn phase(&self) -> SupervisorPhase {
        self.phases.phase()
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    async fn synchronize(&self) -> Result<(), EngineError> {
        let result = self.engine.synchronize().await;
        supervisor_metrics().record_synchronize(result.is_ok());
        if let Err(e) = &result {
            error!(phase = %self.phase(), polls = self.polls, error = %e, "Synchronize failed");
        }
        result
    }

    async fn boot(&self) -> Result<(), EngineError> {
        let result = self
            .engine
            .boot(&self.settings.cycle, &self.settings.task_list)
            .await;
        supervisor_metrics().record_boot(result.is_ok());
        if let Err(e) = &result {
            error!(
                cycle = %self.settings.cycle,
                task_list = %self.settings.task_list,
                error = %e,
                "Boot failed"
            );
        }
        result
    }

    /// Drive the engine until `shutdown` yields a message or is closed.
    ///
    /// Shutdown is only observed while waiting between polls; an engine call
    /// that has started always runs to completion first.
    pub async fn run(&mut self, mut shutdown: mpsc::Receiver<()>) -> Result<RunSummary, EngineError> {
        let started_at = Utc::now();
        info!(
            cycle = %self.settings.cycle,
            task_list = %self.settings.task_list,
            poll_interval_secs = self.settings.poll_interval.as_secs_f64(),
            "Supervisor starting"
        );

        self.synchronize().await?;
        self.phases.handle(PhaseEvent::Synchronized);

        self.boot().await?;
        self.phases.handle(PhaseEvent::Booted);
        info!(cycle = %self.settings.cycle, task_list = %self.settings.task_list, "Cycle booted");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                _ = shutdown.recv() => {
                    info!(polls = self.polls, "Shutdown requested, leaving poll loop");
                    return Ok(RunSummary {
                        polls: self.polls,
                        phase: self.phase(),
                        started_at,
                        stopped_at: Utc::now(),
                    });
                }
            }

            self.synchronize().await?;
            self.polls += 1;
            self.phases.handle(PhaseEvent::Polled);
            debug!(polls = self.polls, "Poll completed");
        }
    }

    /// Run with no way to stop other than an engine error or process exit.
    pub async fn run_forever(&mut self) -> Result<RunSummary, EngineError> {
        let (_keep_open, shutdown) = mpsc::channel(1);
        self.run(shutdown).await
    }
}
