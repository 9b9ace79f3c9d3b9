use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::task::SchedulerError;

/// Lower bound (inclusive) for a worker's fatigue factor.
pub const FATIGUE_MIN: f64 = 0.5;
/// Upper bound (exclusive) for a worker's fatigue factor.
pub const FATIGUE_MAX: f64 = 1.5;

/// Scheduler configuration, typically parsed from TOML or built from env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads. 0 = available parallelism, or the length
    /// of `fatigue_factors` when those are given.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Seed for generating fatigue factors. Random when unset.
    #[serde(default)]
    pub fatigue_seed: Option<u64>,
    /// Explicit per-worker fatigue factors, indexed by worker id.
    #[serde(default)]
    pub fatigue_factors: Option<Vec<f64>>,
}

fn default_worker_threads() -> usize {
    0
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            fatigue_seed: None,
            fatigue_factors: None,
        }
    }
}

impl SchedulerConfig {
    pub fn with_threads(worker_threads: usize) -> Self {
        Self {
            worker_threads,
            ..Self::default()
        }
    }

    /// Resolve worker thread count (0 means derive it).
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads != 0 {
            return self.worker_threads;
        }
        if let Some(factors) = &self.fatigue_factors {
            return factors.len();
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }

    /// One fatigue factor per worker, in `[FATIGUE_MIN, FATIGUE_MAX)`.
    pub fn resolved_fatigue_factors(&self) -> Result<Vec<f64>, SchedulerError> {
        let count = self.resolved_worker_threads();
        if count == 0 {
            return Err(SchedulerError::InvalidWorkerCount(0));
        }

        if let Some(factors) = &self.fatigue_factors {
            if factors.len() != count {
                return Err(SchedulerError::InvalidWorkerCount(factors.len()));
            }
            for (worker, &factor) in factors.iter().enumerate() {
                if !(FATIGUE_MIN..FATIGUE_MAX).contains(&factor) {
                    return Err(SchedulerError::InvalidFatigueFactor { worker, factor });
                }
            }
            return Ok(factors.clone());
        }

        let mut rng = match self.fatigue_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok((0..count)
            .map(|_| rng.gen_range(FATIGUE_MIN..FATIGUE_MAX))
            .collect())
    }
}

/// A task that returned an error or panicked.
#[derive(Debug, Clone, Serialize)]
pub struct TaskFailure {
    /// Worker that ran the task.
    pub worker: usize,
    pub error: String,
}

/// Result of a completed [`submit_batch`](super::Scheduler::submit_batch).
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    /// Number of tasks handed to workers.
    pub submitted: usize,
    /// Tasks of this batch that failed.
    pub failures: Vec<TaskFailure>,
    /// Wall time from first submission until the batch drained.
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
