//! Workflow engine seam
//!
//! The supervisor never owns workflow state. It only asks the engine to
//! re-evaluate itself (`synchronize`) or to cold-start a cycle (`boot`).
//! Everything behind those two calls belongs to the engine.

pub mod errors;
pub mod retry;
pub mod rocoto;
pub mod types;

use async_trait::async_trait;

pub use errors::{EngineError, ErrorClass};
pub use retry::{RetryPolicy, RetryingEngine};
pub use rocoto::{RocotoEngine, RocotoPaths};
pub use types::{CycleIdentifier, TaskListIdentifier};

/// Operations the supervisor consumes from the workflow engine.
///
/// Both calls are blocking from the caller's point of view: the future
/// resolves only once the engine has finished or failed.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Mark finished tasks done, release tasks whose dependencies are met,
    /// record failures.
    async fn synchronize(&self) -> Result<(), EngineError>;

    /// Activate `task_list` in `cycle` as a fresh execution context.
    async fn boot(
        &self,
        cycle: &CycleIdentifier,
        task_list: &TaskListIdentifier,
    ) -> Result<(), EngineError>;
}

#[async_trait]
impl<E: WorkflowEngine + ?Sized> WorkflowEngine for std::sync::Arc<E> {
    async fn synchronize(&self) -> Result<(), EngineError> {
        (**self).synchronize().await
    }

    async fn boot(
        &self,
        cycle: &CycleIdentifier,
        task_list: &TaskListIdentifier,
    ) -> Result<(), EngineError> {
        (**self).boot(cycle, task_list).await
    }
}
