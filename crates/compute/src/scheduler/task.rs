use crate::memory::MemoryError;

/// A unit of work submitted to the [`Scheduler`](super::Scheduler).
///
/// Returning an error or panicking marks the task failed; neither affects
/// the worker that ran it.
pub type Task = Box<dyn FnOnce() -> Result<(), ComputeError> + Send + 'static>;

/// Box a closure as a [`Task`].
pub fn task<F>(f: F) -> Task
where
    F: FnOnce() -> Result<(), ComputeError> + Send + 'static,
{
    Box::new(f)
}

/// Error type for a task body.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("Task failed: {0}")]
    Failed(String),
    #[error("Task panicked: {0}")]
    Panicked(String),
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// Errors raised by the scheduler itself.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Worker pool size must be at least 1, got {0}")]
    InvalidWorkerCount(usize),
    #[error("Fatigue factor {factor} for worker {worker} is outside [0.5, 1.5)")]
    InvalidFatigueFactor { worker: usize, factor: f64 },
    /// A task was assigned to a worker whose mailbox was already occupied.
    /// Only reachable through a scheduler bug.
    #[error("Worker {worker} is not ready to accept a task")]
    WorkerBusy { worker: usize },
    #[error("Worker {worker} has terminated")]
    WorkerGone { worker: usize },
    #[error("Scheduler has been shut down")]
    ShutDown,
    #[error("Interrupted while shutting down worker {worker}")]
    Interrupted { worker: usize },
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),
}
