//! Fatigue-weighted worker pool.
//!
//! Every task is handed to the idle worker with the lowest fatigue score
//! (fatigue factor x cumulative busy time, ties broken by worker id). A
//! worker that has done more weighted work is picked later, so faster or
//! less loaded workers absorb more of the next batch.
//! [`Scheduler::submit_batch`] is the rendezvous point: it returns only once
//! every task of the batch has finished.

mod barrier;
mod idle;
pub mod metrics;
pub mod runner;
pub mod task;
pub mod types;
pub mod worker;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use metrics::{fairness_score, WorkerReport, WorkerStats};
pub use runner::Scheduler;
pub use task::{task, ComputeError, SchedulerError, Task};
pub use types::{BatchOutcome, SchedulerConfig, TaskFailure, FATIGUE_MAX, FATIGUE_MIN};
pub use worker::WorkerState;

/// Bookkeeping mutexes never guard user code, so a poisoned one still holds
/// consistent data.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
