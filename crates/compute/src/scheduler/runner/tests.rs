#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use crate::scheduler::runner::Scheduler;
    use crate::scheduler::task::{task, ComputeError, SchedulerError, Task};
    use crate::scheduler::types::SchedulerConfig;

    fn fixed(factors: &[f64]) -> Scheduler {
        Scheduler::with_config(SchedulerConfig {
            fatigue_factors: Some(factors.to_vec()),
            ..SchedulerConfig::default()
        })
        .unwrap()
    }

    fn worker_name() -> String {
        thread::current().name().unwrap_or("unnamed").to_string()
    }

    /// Task that sleeps, then records which worker ran it.
    fn recording(log: &Arc<Mutex<Vec<String>>>, sleep: Duration) -> Task {
        let log = Arc::clone(log);
        task(move || {
            thread::sleep(sleep);
            log.lock().unwrap().push(worker_name());
            Ok(())
        })
    }

    #[test]
    fn zero_workers_rejected() {
        assert!(matches!(
            Scheduler::new(0),
            Err(SchedulerError::InvalidWorkerCount(0))
        ));
    }

    #[test]
    fn scheduler_creation() {
        let scheduler = Scheduler::new(3).unwrap();
        assert_eq!(scheduler.worker_count(), 3);
        assert_eq!(scheduler.idle_workers(), 3);
        assert_eq!(scheduler.in_flight(), 0);
        assert!(scheduler.is_accepting());
        for id in 0..3 {
            let factor = scheduler.worker(id).unwrap().fatigue_factor();
            assert!((0.5..1.5).contains(&factor));
        }
    }

    #[test]
    fn submit_batch_waits_for_completion() {
        let scheduler = Scheduler::new(4).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<Task> = (0..100)
            .map(|_| {
                let counter = Arc::clone(&counter);
                task(move || {
                    thread::sleep(Duration::from_millis(1));
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        let outcome = scheduler.submit_batch(tasks).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 100);
        assert_eq!(outcome.submitted, 100);
        assert!(outcome.is_success());
        assert_eq!(scheduler.in_flight(), 0);
        assert_eq!(scheduler.idle_workers(), 4);
        assert_eq!(scheduler.report().total_tasks(), 100);
    }

    #[test]
    fn empty_batch_returns_immediately() {
        let scheduler = Scheduler::new(2).unwrap();
        let outcome = scheduler.submit_batch(Vec::new()).unwrap();
        assert_eq!(outcome.submitted, 0);
        assert!(outcome.is_success());
    }

    #[test]
    fn tasks_run_in_parallel() {
        let scheduler = Scheduler::new(4).unwrap();
        let sleep = Duration::from_millis(200);
        let tasks: Vec<Task> = (0..4)
            .map(|_| {
                task(move || {
                    thread::sleep(sleep);
                    Ok(())
                })
            })
            .collect();

        let start = Instant::now();
        scheduler.submit_batch(tasks).unwrap();
        let elapsed = start.elapsed();

        // Sequential execution would take 800ms.
        assert!(
            elapsed < Duration::from_millis(640),
            "tasks ran sequentially, took {:?}",
            elapsed
        );
    }

    #[test]
    fn single_submit_runs_task() {
        let scheduler = Scheduler::new(2).unwrap();
        let (tx, rx) = mpsc::channel();
        scheduler
            .submit(task(move || {
                tx.send(worker_name()).unwrap();
                Ok(())
            }))
            .unwrap();
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(name.starts_with("lae-worker-"));
    }

    #[test]
    fn failed_tasks_do_not_break_bookkeeping() {
        let scheduler = Scheduler::new(2).unwrap();
        let tasks: Vec<Task> = vec![
            task(|| panic!("I crashed!")),
            task(|| Err(ComputeError::Failed("bad row".to_string()))),
            task(|| {
                thread::sleep(Duration::from_millis(10));
                Ok(())
            }),
        ];

        let outcome = scheduler.submit_batch(tasks).unwrap();
        assert_eq!(outcome.submitted, 3);
        assert_eq!(outcome.failures.len(), 2);
        assert!(outcome.failures.iter().any(|f| f.error.contains("I crashed!")));
        assert!(outcome.failures.iter().any(|f| f.error.contains("bad row")));
        assert_eq!(scheduler.in_flight(), 0);
        assert_eq!(scheduler.idle_workers(), 2);

        // Both workers are still alive and pick up new work.
        let log = Arc::new(Mutex::new(Vec::new()));
        let tasks: Vec<Task> = (0..2)
            .map(|_| recording(&log, Duration::from_millis(50)))
            .collect();
        let outcome = scheduler.submit_batch(tasks).unwrap();
        assert!(outcome.is_success());

        let mut names = log.lock().unwrap().clone();
        names.sort();
        assert_eq!(names, vec!["lae-worker-0", "lae-worker-1"]);

        let report = scheduler.report();
        assert_eq!(report.workers.iter().map(|w| w.tasks_failed).sum::<u64>(), 2);
        assert!(report.workers.iter().all(|w| w.alive));
    }

    #[test]
    fn every_worker_participates() {
        let scheduler = Scheduler::new(4).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let tasks: Vec<Task> = (0..100)
            .map(|_| recording(&log, Duration::from_millis(1)))
            .collect();
        scheduler.submit_batch(tasks).unwrap();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for name in log.lock().unwrap().iter() {
            *counts.entry(name.clone()).or_default() += 1;
        }
        for id in 0..4 {
            let name = format!("lae-worker-{}", id);
            assert!(
                counts.get(&name).copied().unwrap_or(0) > 0,
                "{} did nothing: {:?}",
                name,
                counts
            );
        }
    }

    #[test]
    fn least_fatigued_worker_picked_with_id_tie_break() {
        let scheduler = fixed(&[1.0, 1.0, 1.0]);
        let log = Arc::new(Mutex::new(Vec::new()));

        // All start at zero fatigue, so ids decide. Each finished worker
        // carries positive fatigue, so the next untouched worker wins.
        for _ in 0..3 {
            scheduler
                .submit_batch(vec![recording(&log, Duration::from_millis(2))])
                .unwrap();
        }

        assert_eq!(
            *log.lock().unwrap(),
            vec!["lae-worker-0", "lae-worker-1", "lae-worker-2"]
        );
    }

    #[test]
    fn fatigue_factor_weights_selection() {
        // Same busy time, but worker 1 is much "slower".
        let scheduler = fixed(&[0.5, 1.4]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let tasks: Vec<Task> = (0..2)
            .map(|_| recording(&log, Duration::from_millis(20)))
            .collect();
        scheduler.submit_batch(tasks).unwrap();

        let w0 = scheduler.worker(0).unwrap();
        let w1 = scheduler.worker(1).unwrap();
        assert!(w0.fatigue() < w1.fatigue());

        log.lock().unwrap().clear();
        scheduler
            .submit_batch(vec![recording(&log, Duration::from_millis(1))])
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["lae-worker-0"]);
    }

    #[test]
    fn timers_are_additive() {
        let start = Instant::now();
        let scheduler = Scheduler::new(3).unwrap();
        for _ in 0..3 {
            let tasks: Vec<Task> = (0..6)
                .map(|_| {
                    task(|| {
                        thread::sleep(Duration::from_millis(5));
                        Ok(())
                    })
                })
                .collect();
            scheduler.submit_batch(tasks).unwrap();
        }
        thread::sleep(Duration::from_millis(20));

        let report = scheduler.report();
        let elapsed = start.elapsed().as_nanos() as f64 * 3.0;
        let accounted = (report.total_time_used_ns() + report.total_time_idle_ns()) as f64;
        assert!(accounted <= elapsed, "accounted {} > elapsed {}", accounted, elapsed);
        assert!(
            accounted >= elapsed * 0.8,
            "accounted {} << elapsed {}",
            accounted,
            elapsed
        );
        assert!(report.total_time_used_ns() > 0);
    }

    #[test]
    fn shutdown_rejects_new_work() {
        let scheduler = Scheduler::new(2).unwrap();
        scheduler.submit_batch(vec![task(|| Ok(()))]).unwrap();

        scheduler.shutdown().unwrap();
        assert!(!scheduler.is_accepting());
        assert!(matches!(
            scheduler.submit(task(|| Ok(()))),
            Err(SchedulerError::ShutDown)
        ));
        assert!(matches!(
            scheduler.submit_batch(vec![task(|| Ok(()))]),
            Err(SchedulerError::ShutDown)
        ));

        // Idempotent, and the report is still available.
        scheduler.shutdown().unwrap();
        let report = scheduler.report();
        assert_eq!(report.total_tasks(), 1);
        assert!(report.workers.iter().all(|w| !w.alive));
    }

    #[test]
    fn shutdown_racing_batch_never_strands_tasks() {
        for _ in 0..200 {
            let scheduler = Arc::new(Scheduler::new(2).unwrap());
            let (done_tx, done_rx) = mpsc::channel();
            let submitter = {
                let scheduler = Arc::clone(&scheduler);
                thread::spawn(move || {
                    let tasks: Vec<Task> = (0..50).map(|_| task(|| Ok(()))).collect();
                    let result = scheduler.submit_batch(tasks);
                    done_tx.send(result.map(|outcome| outcome.submitted)).unwrap();
                })
            };

            scheduler.shutdown().unwrap();
            let result = done_rx
                .recv_timeout(Duration::from_secs(5))
                .expect("batch hung after shutdown");
            match result {
                Ok(submitted) => assert_eq!(submitted, 50),
                Err(e) => assert!(matches!(e, SchedulerError::ShutDown), "unexpected {:?}", e),
            }
            submitter.join().unwrap();
            assert_eq!(scheduler.in_flight(), 0);
        }
    }

    #[test]
    fn worker_report_text() {
        let scheduler = Scheduler::new(2).unwrap();
        scheduler.submit_batch(vec![task(|| Ok(()))]).unwrap();
        let text = scheduler.worker_report();
        assert!(text.contains("Worker 0:"));
        assert!(text.contains("Worker 1:"));
        assert!(text.contains("Fairness Score (Lower is better):"));
    }
}
