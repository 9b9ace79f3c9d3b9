//! A single worker: a plain state record plus the thread loop that drives it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use super::lock;
use super::metrics::WorkerStats;
use super::task::{ComputeError, SchedulerError, Task};

/// Called by the worker thread once a task has finished and the worker's
/// timers are up to date.
pub(crate) type Completion = Box<dyn FnOnce(&WorkerState, Result<(), ComputeError>) + Send>;

pub(crate) enum Envelope {
    Run { task: Task, on_complete: Completion },
    Stop,
}

/// Identity, timers and counters of one worker.
#[derive(Debug)]
pub struct WorkerState {
    id: usize,
    fatigue_factor: f64,
    alive: AtomicBool,
    busy: AtomicBool,
    time_used_ns: AtomicU64,
    time_idle_ns: AtomicU64,
    idle_since: Mutex<Instant>,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

impl WorkerState {
    pub fn new(id: usize, fatigue_factor: f64) -> Self {
        Self {
            id,
            fatigue_factor,
            alive: AtomicBool::new(true),
            busy: AtomicBool::new(false),
            time_used_ns: AtomicU64::new(0),
            time_idle_ns: AtomicU64::new(0),
            idle_since: Mutex::new(Instant::now()),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn fatigue_factor(&self) -> f64 {
        self.fatigue_factor
    }

    /// Fatigue factor x cumulative busy nanoseconds.
    pub fn fatigue(&self) -> f64 {
        self.fatigue_factor * self.time_used_ns.load(Ordering::Acquire) as f64
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn time_used(&self) -> Duration {
        Duration::from_nanos(self.time_used_ns.load(Ordering::Acquire))
    }

    /// Idle time recorded so far, plus the current idle span when idle.
    pub fn time_idle(&self) -> Duration {
        let recorded = Duration::from_nanos(self.time_idle_ns.load(Ordering::Acquire));
        if self.is_busy() {
            return recorded;
        }
        recorded + lock(&self.idle_since).elapsed()
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            id: self.id,
            fatigue_factor: self.fatigue_factor,
            fatigue: self.fatigue(),
            time_used_ns: nanos(self.time_used()),
            time_idle_ns: nanos(self.time_idle()),
            tasks_completed: self.tasks_completed.load(Ordering::Acquire),
            tasks_failed: self.tasks_failed.load(Ordering::Acquire),
            alive: self.is_alive(),
        }
    }

    /// Run one task, containing any error or panic, and account its time.
    fn execute(&self, task: Task) -> Result<(), ComputeError> {
        self.busy.store(true, Ordering::Release);
        let start = Instant::now();
        {
            let idle_since = lock(&self.idle_since);
            self.time_idle_ns
                .fetch_add(nanos(start.saturating_duration_since(*idle_since)), Ordering::AcqRel);
        }

        let outcome = match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(result) => result,
            Err(payload) => Err(ComputeError::Panicked(panic_message(payload.as_ref()))),
        };

        let end = Instant::now();
        self.time_used_ns
            .fetch_add(nanos(end.saturating_duration_since(start)), Ordering::AcqRel);
        *lock(&self.idle_since) = end;
        match outcome {
            Ok(()) => self.tasks_completed.fetch_add(1, Ordering::AcqRel),
            Err(_) => self.tasks_failed.fetch_add(1, Ordering::AcqRel),
        };
        self.busy.store(false, Ordering::Release);
        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Thread loop: block for the next envelope, run it, repeat until stopped.
fn run_loop(state: &WorkerState, mailbox: Receiver<Envelope>) {
    while state.is_alive() {
        let (task, on_complete) = match mailbox.recv() {
            Ok(Envelope::Run { task, on_complete }) => (task, on_complete),
            Ok(Envelope::Stop) | Err(_) => break,
        };
        let outcome = state.execute(task);
        on_complete(state, outcome);
    }

    // A task that was assigned but never started still has to be accounted.
    while let Ok(envelope) = mailbox.try_recv() {
        if let Envelope::Run { on_complete, .. } = envelope {
            on_complete(
                state,
                Err(ComputeError::Failed(format!(
                    "worker {} shut down before the task started",
                    state.id
                ))),
            );
        }
    }
    debug!(worker = state.id, "worker terminated");
}

/// Handle owned by the scheduler: shared state, single-slot mailbox and the
/// thread running [`run_loop`].
pub(crate) struct Worker {
    state: Arc<WorkerState>,
    mailbox: SyncSender<Envelope>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    pub(crate) fn spawn(id: usize, fatigue_factor: f64) -> Result<Self, SchedulerError> {
        let (mailbox, inbox) = mpsc::sync_channel(1);
        let state = Arc::new(WorkerState::new(id, fatigue_factor));
        let loop_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name(format!("lae-worker-{}", id))
            .spawn(move || run_loop(&loop_state, inbox))
            .map_err(|e| SchedulerError::Spawn(e.to_string()))?;

        Ok(Self {
            state,
            mailbox,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub(crate) fn state(&self) -> &WorkerState {
        &self.state
    }

    /// Non-blocking hand-off into the single-slot mailbox.
    pub(crate) fn assign(&self, task: Task, on_complete: Completion) -> Result<(), SchedulerError> {
        match self.mailbox.try_send(Envelope::Run { task, on_complete }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                error!(worker = self.state.id, "task assigned to a worker with a full mailbox");
                Err(SchedulerError::WorkerBusy {
                    worker: self.state.id,
                })
            }
            Err(TrySendError::Disconnected(_)) => Err(SchedulerError::WorkerGone {
                worker: self.state.id,
            }),
        }
    }

    /// Stop after the current task. The stop envelope wakes a worker that is
    /// blocked waiting for work; a full mailbox means the worker will see the
    /// cleared alive flag after its next task instead.
    pub(crate) fn request_shutdown(&self) {
        self.state.alive.store(false, Ordering::Release);
        let _ = self.mailbox.try_send(Envelope::Stop);
    }

    /// Wait for the worker thread. Returns `false` if it did not exit cleanly.
    pub(crate) fn join(&self) -> bool {
        let handle = lock(&self.handle).take();
        match handle {
            Some(handle) => handle.join().is_ok(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::scheduler::task::task;

    fn completion(tx: mpsc::Sender<(usize, bool)>) -> Completion {
        Box::new(move |state: &WorkerState, outcome: Result<(), ComputeError>| {
            tx.send((state.id(), outcome.is_ok())).unwrap();
        })
    }

    #[test]
    fn fatigue_starts_at_zero_and_grows() {
        let worker = Worker::spawn(1, 1.2).unwrap();
        assert_eq!(worker.state().fatigue(), 0.0);

        let (tx, rx) = mpsc::channel();
        worker
            .assign(
                task(|| {
                    thread::sleep(Duration::from_millis(5));
                    Ok(())
                }),
                completion(tx),
            )
            .unwrap();
        assert_eq!(rx.recv().unwrap(), (1, true));

        let state = worker.state();
        assert!(state.fatigue() > 0.0);
        assert!(state.time_used() >= Duration::from_millis(5));
        assert!((state.fatigue() - 1.2 * state.time_used().as_nanos() as f64).abs() < 1.0);

        worker.request_shutdown();
        assert!(worker.join());
    }

    #[test]
    fn higher_factor_means_more_fatigue_for_same_work() {
        let a = WorkerState::new(0, 0.5);
        let b = WorkerState::new(1, 1.4);
        let work = || {
            thread::sleep(Duration::from_millis(2));
            Ok(())
        };
        a.execute(task(work)).unwrap();
        b.execute(task(work)).unwrap();
        let rate = |s: &WorkerState| s.fatigue() / s.time_used().as_nanos() as f64;
        assert!(rate(&a) < rate(&b));
    }

    #[test]
    fn panicking_task_does_not_kill_worker() {
        let worker = Worker::spawn(0, 1.0).unwrap();
        let (tx, rx) = mpsc::channel();

        worker
            .assign(task(|| panic!("boom")), completion(tx.clone()))
            .unwrap();
        assert_eq!(rx.recv().unwrap(), (0, false));

        worker.assign(task(|| Ok(())), completion(tx)).unwrap();
        assert_eq!(rx.recv().unwrap(), (0, true));

        let stats = worker.state().stats();
        assert_eq!(stats.tasks_failed, 1);
        assert_eq!(stats.tasks_completed, 1);

        worker.request_shutdown();
        assert!(worker.join());
    }

    #[test]
    fn full_mailbox_is_worker_busy() {
        let worker = Worker::spawn(4, 1.0).unwrap();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();

        worker
            .assign(
                task(move || {
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    Ok(())
                }),
                completion(done_tx.clone()),
            )
            .unwrap();
        started_rx.recv().unwrap();

        // Worker is running the first task; the slot takes one more.
        worker.assign(task(|| Ok(())), completion(done_tx.clone())).unwrap();
        let err = worker
            .assign(task(|| Ok(())), completion(done_tx))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::WorkerBusy { worker: 4 }));

        release_tx.send(()).unwrap();
        assert_eq!(done_rx.recv().unwrap(), (4, true));
        assert_eq!(done_rx.recv().unwrap(), (4, true));

        worker.request_shutdown();
        assert!(worker.join());
    }

    #[test]
    fn join_reports_thread_lost_to_completion_panic() {
        let worker = Worker::spawn(3, 1.0).unwrap();
        let on_complete: Completion = Box::new(|_: &WorkerState, _: Result<(), ComputeError>| {
            panic!("completion failed");
        });
        worker.assign(task(|| Ok(())), on_complete).unwrap();

        worker.request_shutdown();
        assert!(!worker.join());
        // Already joined.
        assert!(worker.join());
    }

    #[test]
    fn shutdown_wakes_idle_worker() {
        let worker = Worker::spawn(2, 1.0).unwrap();
        worker.request_shutdown();
        assert!(worker.join());
        assert!(!worker.state().is_alive());

        let (tx, _rx) = mpsc::channel();
        let err = worker.assign(task(|| Ok(())), completion(tx)).unwrap_err();
        assert!(matches!(err, SchedulerError::WorkerGone { worker: 2 }));
    }

    #[test]
    fn idle_and_busy_cover_lifetime() {
        let created = Instant::now();
        let state = WorkerState::new(0, 1.0);
        thread::sleep(Duration::from_millis(5));
        state
            .execute(task(|| {
                thread::sleep(Duration::from_millis(5));
                Ok(())
            }))
            .unwrap();
        thread::sleep(Duration::from_millis(5));

        let total = state.time_used() + state.time_idle();
        assert!(total <= created.elapsed());
        assert!(total >= Duration::from_millis(15));
    }
}
