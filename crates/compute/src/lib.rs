pub mod engine;
pub mod memory;
pub mod scheduler;

pub use engine::{EngineError, LinearAlgebraEngine};
pub use memory::{MemoryError, Orientation, SharedMatrix, SharedVector};
pub use scheduler::{
    task, BatchOutcome, ComputeError, Scheduler, SchedulerConfig, SchedulerError, Task,
    TaskFailure, WorkerReport, WorkerStats,
};
