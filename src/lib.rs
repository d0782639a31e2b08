// Cycle Supervisor Library - boots a workflow cycle and keeps its engine advancing
// This exposes the core components for testing and integration

pub mod config;
pub mod engine;
pub mod external;
pub mod observability;
pub mod shutdown;
pub mod supervisor;
pub mod telemetry;

// Re-export key types for easy access
pub use config::{SupervisorConfig, CONFIG_FILE_NAME, ENV_PREFIX};
pub use engine::{
    CycleIdentifier, EngineError, ErrorClass, RetryPolicy, RetryingEngine, RocotoEngine,
    RocotoPaths, TaskListIdentifier, WorkflowEngine,
};
pub use external::{CommandError, CommandExecutor, CommandOutput, ProcessCommandExecutor};
pub use observability::{supervisor_metrics, OperationTimer, SupervisorMetrics, SupervisorStats};
pub use shutdown::ShutdownCoordinator;
pub use supervisor::{RunSummary, Supervisor, SupervisorPhase, SupervisorSettings};
pub use telemetry::{create_engine_span, generate_correlation_id, init_telemetry};
