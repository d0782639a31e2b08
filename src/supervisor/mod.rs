// Supervisor loop: boot a cycle once, then keep the engine advancing.

pub mod runner;
pub mod state_machine;

pub use runner::{
    RunSummary, Supervisor, SupervisorSettings, DEFAULT_CYCLE, DEFAULT_POLL_INTERVAL,
    DEFAULT_TASK_LIST,
};
pub use state_machine::{PhaseEvent, PhaseTracker, SupervisorPhase};
