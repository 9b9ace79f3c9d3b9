use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, warn};

use crate::scheduler::lock;
use crate::scheduler::task::{ComputeError, SchedulerError, Task};
use crate::scheduler::types::{BatchOutcome, TaskFailure};
use crate::scheduler::worker::{Completion, WorkerState};

use super::Scheduler;

type FailureLog = Arc<Mutex<Vec<TaskFailure>>>;

impl Scheduler {
    /// Hand `task` to the least fatigued idle worker, blocking while every
    /// worker is busy. Returns once the task is assigned, not when it ends.
    pub fn submit(&self, task: Task) -> Result<(), SchedulerError> {
        self.dispatch(task, None)
    }

    /// Submit every task, then block until all of them have finished.
    ///
    /// Tasks may run in any order and interleave freely across workers. If a
    /// submission fails, the tasks already handed out are still waited for
    /// before the error is returned.
    pub fn submit_batch<I>(&self, tasks: I) -> Result<BatchOutcome, SchedulerError>
    where
        I: IntoIterator<Item = Task>,
    {
        let started = Instant::now();
        let failures: FailureLog = Arc::new(Mutex::new(Vec::new()));
        let mut submitted = 0;

        for task in tasks {
            if let Err(e) = self.dispatch(task, Some(Arc::clone(&failures))) {
                self.shared.in_flight.wait_drained();
                return Err(e);
            }
            submitted += 1;
        }
        self.shared.in_flight.wait_drained();

        let failures = std::mem::take(&mut *lock(&failures));
        let outcome = BatchOutcome {
            submitted,
            failures,
            elapsed: started.elapsed(),
        };
        debug!(
            tasks = outcome.submitted,
            failed = outcome.failures.len(),
            elapsed_us = outcome.elapsed.as_micros() as u64,
            "Batch complete"
        );
        Ok(outcome)
    }

    fn dispatch(&self, task: Task, failures: Option<FailureLog>) -> Result<(), SchedulerError> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(SchedulerError::ShutDown);
        }

        self.shared.in_flight.increment();
        let id = self.shared.idle.pop_blocking();
        let Some(worker) = self.workers.get(id) else {
            self.shared.in_flight.decrement();
            return Err(SchedulerError::WorkerGone { worker: id });
        };
        let _gate = lock(&self.dispatch_gate);
        // Shutdown may have started while we waited for a worker.
        if !self.accepting.load(Ordering::Acquire) {
            self.shared.idle.push(id, worker.state().fatigue());
            self.shared.in_flight.decrement();
            return Err(SchedulerError::ShutDown);
        }
        debug!(worker = id, fatigue = worker.state().fatigue(), "Dispatching task");

        let shared = Arc::clone(&self.shared);
        let on_complete: Completion = Box::new(
            move |state: &WorkerState, outcome: Result<(), ComputeError>| {
                if let Err(error) = outcome {
                    warn!(worker = state.id(), error = %error, "Task failed");
                    if let Some(log) = &failures {
                        lock(log).push(TaskFailure {
                            worker: state.id(),
                            error: error.to_string(),
                        });
                    }
                }
                // Re-queue before the decrement so that once a batch drains
                // every worker is idle again.
                shared.idle.push(state.id(), state.fatigue());
                shared.in_flight.decrement();
            },
        );

        if let Err(e) = worker.assign(task, on_complete) {
            // The popped worker is not re-queued: it either still owns a
            // pending task or has terminated.
            self.shared.in_flight.decrement();
            return Err(e);
        }
        Ok(())
    }
}
