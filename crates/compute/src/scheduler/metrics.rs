use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time statistics for one worker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStats {
    pub id: usize,
    pub fatigue_factor: f64,
    /// Fatigue factor x busy nanoseconds.
    pub fatigue: f64,
    pub time_used_ns: u64,
    pub time_idle_ns: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub alive: bool,
}

/// Worker activity report exposed to the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    pub generated_at: DateTime<Utc>,
    pub workers: Vec<WorkerStats>,
    /// Sum of squared deviations of each worker's fatigue from the mean.
    /// Diagnostic only; lower is better.
    pub fairness: f64,
}

impl WorkerReport {
    pub fn new(workers: Vec<WorkerStats>) -> Self {
        let fatigues: Vec<f64> = workers.iter().map(|w| w.fatigue).collect();
        Self {
            generated_at: Utc::now(),
            fairness: fairness_score(&fatigues),
            workers,
        }
    }

    pub fn total_time_used_ns(&self) -> u64 {
        self.workers.iter().map(|w| w.time_used_ns).sum()
    }

    pub fn total_time_idle_ns(&self) -> u64 {
        self.workers.iter().map(|w| w.time_idle_ns).sum()
    }

    pub fn total_tasks(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| w.tasks_completed + w.tasks_failed)
            .sum()
    }
}

impl fmt::Display for WorkerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for w in &self.workers {
            writeln!(
                f,
                "Worker {}:\tFatigue: {:.1}\tTime used: {} ns\tTime idle: {} ns\tTasks: {} ok / {} failed",
                w.id, w.fatigue, w.time_used_ns, w.time_idle_ns, w.tasks_completed, w.tasks_failed
            )?;
        }
        writeln!(f, "----------------------------------------")?;
        write!(f, "Fairness Score (Lower is better): {:.4}", self.fairness)
    }
}

/// Sum of squared deviations from the mean. Zero for an empty slice.
pub fn fairness_score(fatigues: &[f64]) -> f64 {
    if fatigues.is_empty() {
        return 0.0;
    }
    let mean = fatigues.iter().sum::<f64>() / fatigues.len() as f64;
    fatigues.iter().map(|f| (f - mean).powi(2)).sum()
}
