use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::scheduler::barrier::InFlight;
use crate::scheduler::idle::IdleQueue;
use crate::scheduler::lock;
use crate::scheduler::metrics::WorkerReport;
use crate::scheduler::task::SchedulerError;
use crate::scheduler::types::SchedulerConfig;
use crate::scheduler::worker::{Worker, WorkerState};

/// State shared between the scheduler and the completion callbacks that
/// run on worker threads.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub(crate) idle: IdleQueue,
    pub(crate) in_flight: InFlight,
}

/// The fatigue-weighted scheduler. Owns a fixed pool of workers and hands
/// each task to the least fatigued idle one.
pub struct Scheduler {
    pub(super) workers: Vec<Worker>,
    pub(super) shared: Arc<Shared>,
    /// Cleared by [`Scheduler::shutdown`]; submissions are refused afterwards.
    pub(super) accepting: AtomicBool,
    /// Held across the final `accepting` check and the hand-off to a worker.
    /// `shutdown` clears `accepting` under it, so no task can reach a mailbox
    /// once workers have been asked to stop.
    pub(super) dispatch_gate: Mutex<()>,
}

impl Scheduler {
    /// Create a scheduler with `threads` workers and random fatigue factors.
    pub fn new(threads: usize) -> Result<Self, SchedulerError> {
        if threads == 0 {
            return Err(SchedulerError::InvalidWorkerCount(0));
        }
        Self::with_config(SchedulerConfig::with_threads(threads))
    }

    pub fn with_config(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let factors = config.resolved_fatigue_factors()?;
        let shared = Arc::new(Shared::default());

        let mut workers = Vec::with_capacity(factors.len());
        for (id, &factor) in factors.iter().enumerate() {
            let worker = match Worker::spawn(id, factor) {
                Ok(worker) => worker,
                Err(e) => {
                    for started in &workers {
                        shutdown_worker(started);
                    }
                    return Err(e);
                }
            };
            // At first every worker is idle.
            shared.idle.push(id, 0.0);
            workers.push(worker);
        }

        info!(
            workers = workers.len(),
            factors = ?factors,
            "Scheduler started"
        );

        Ok(Self {
            workers,
            shared,
            accepting: AtomicBool::new(true),
            dispatch_gate: Mutex::new(()),
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Tasks submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.get()
    }

    /// Workers currently waiting in the idle queue.
    pub fn idle_workers(&self) -> usize {
        self.shared.idle.len()
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    pub fn worker(&self, id: usize) -> Option<&WorkerState> {
        self.workers.get(id).map(Worker::state)
    }

    /// Snapshot of every worker's timers plus the fairness diagnostic.
    pub fn report(&self) -> WorkerReport {
        WorkerReport::new(self.workers.iter().map(|w| w.state().stats()).collect())
    }

    /// Human-readable form of [`Scheduler::report`].
    pub fn worker_report(&self) -> String {
        self.report().to_string()
    }

    /// Ask every worker to stop after its current task, then wait for the
    /// threads. Idempotent.
    ///
    /// Returns `Interrupted` naming the first worker whose thread did not
    /// exit cleanly; the remaining workers are still stopped and joined.
    /// Task panics are caught inside the worker loop, so this only happens
    /// when a completion callback itself panics and takes the thread down.
    pub fn shutdown(&self) -> Result<(), SchedulerError> {
        let was_accepting = {
            let _gate = lock(&self.dispatch_gate);
            self.accepting.swap(false, Ordering::AcqRel)
        };
        for worker in &self.workers {
            worker.request_shutdown();
        }

        let mut result = Ok(());
        for worker in &self.workers {
            if !worker.join() && result.is_ok() {
                result = Err(SchedulerError::Interrupted {
                    worker: worker.state().id(),
                });
            }
        }
        if was_accepting {
            info!(workers = self.workers.len(), "Scheduler stopped");
        }
        result
    }
}

fn shutdown_worker(worker: &Worker) {
    worker.request_shutdown();
    worker.join();
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Scheduler shutdown on drop failed");
        }
    }
}
