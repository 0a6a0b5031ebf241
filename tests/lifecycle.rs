// tests/lifecycle.rs

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tasksched::errors::SchedulerError;
use tasksched::{Scheduler, SchedulerStats};
use tasksched_test_utils::builders::SchedulerConfigBuilder;
use tasksched_test_utils::hooks::RecordingHooks;
use tasksched_test_utils::{TEST_TIMEOUT, init_tracing, with_timeout};

type TestResult = Result<(), SchedulerError>;

#[test]
fn test_start_twice_is_rejected() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let scheduler = SchedulerConfigBuilder::new().workers(2).start();
        assert_eq!(scheduler.worker_count(), 2);
        assert!(matches!(scheduler.start(), Err(SchedulerError::AlreadyStarted)));
        assert_eq!(scheduler.worker_count(), 2);
        scheduler.shutdown()?;
        assert_eq!(scheduler.worker_count(), 0);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_thread_hooks_fire_for_every_worker() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let hooks = RecordingHooks::new();
        let scheduler = SchedulerConfigBuilder::new()
            .workers(3)
            .start_with_hooks(hooks.clone());
        scheduler.shutdown()?;

        let expected: BTreeSet<usize> = [1, 2, 3].into_iter().collect();
        assert_eq!(hooks.thread_starts(), expected);
        assert_eq!(hooks.thread_stops(), expected);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_shutdown_drains_queued_work() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let scheduler = SchedulerConfigBuilder::new().workers(2).start();
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..50 {
            let done = Arc::clone(&done);
            let h = scheduler.create_with(format!("bg-{i}"), move || {
                thread::sleep(Duration::from_micros(200));
                done.fetch_add(1, Ordering::SeqCst);
            })?;
            scheduler.run(h)?;
        }
        for i in 0..5 {
            let done = Arc::clone(&done);
            let h = scheduler.create_with(format!("main-{i}"), move || {
                done.fetch_add(1, Ordering::SeqCst);
            })?;
            scheduler.run_on_main_thread(h)?;
        }

        scheduler.shutdown()?;
        assert_eq!(done.load(Ordering::SeqCst), 55);

        let stats = scheduler.stats();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.queued_worker, 0);
        assert_eq!(stats.queued_main, 0);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_zero_workers_runs_everything_through_helping() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let hooks = RecordingHooks::new();
        let scheduler = SchedulerConfigBuilder::new()
            .workers(0)
            .start_with_hooks(hooks.clone());
        assert_eq!(scheduler.worker_count(), 0);

        let root = scheduler.create("root")?;
        for i in 0..8 {
            let child = scheduler.create_as_child(root, format!("c{i}"), || {})?;
            scheduler.run(child)?;
        }
        scheduler.run(root)?;
        scheduler.wait(root)?;
        scheduler.shutdown()?;

        assert!(hooks.executions().iter().all(|e| e.thread_index == 0));
        assert_eq!(hooks.executions().len(), 9);
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_wait_timeout_gives_up_on_unrun_task() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let scheduler = SchedulerConfigBuilder::new().start();
        let h = scheduler.create("never-run")?;

        assert!(!scheduler.wait_timeout(h, Duration::from_millis(20))?);

        scheduler.run(h)?;
        assert!(scheduler.wait_timeout(h, Duration::from_secs(5))?);
        scheduler.shutdown()
    })
    .unwrap();
}

#[test]
fn test_stats_track_created_and_executed_tasks() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let scheduler = SchedulerConfigBuilder::new().start();
        assert_eq!(scheduler.stats(), SchedulerStats::default());

        let a = scheduler.create("a")?;
        let b = scheduler.create_with("b", || {})?;
        let stats = scheduler.stats();
        assert_eq!(stats.tasks_created, 2);
        assert_eq!(stats.live_tasks, 2);
        assert_eq!(stats.tasks_executed, 0);

        scheduler.run_on_main_thread(a)?;
        scheduler.run_on_main_thread(b)?;
        assert_eq!(scheduler.stats().queued_main, 2);
        assert_eq!(scheduler.stats().in_flight, 2);

        scheduler.execute_main_queue(None)?;
        let stats = scheduler.stats();
        assert_eq!(stats.tasks_executed, 2);
        assert_eq!(stats.live_tasks, 2, "slots recycled before release");
        assert_eq!(stats.in_flight, 0);

        scheduler.release(a)?;
        scheduler.release(b)?;
        assert_eq!(scheduler.stats().live_tasks, 0);
        scheduler.shutdown()
    })
    .unwrap();
}

#[test]
fn test_with_workers_starts_pool_and_names_threads() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let scheduler = Scheduler::with_workers(2)?;
        assert_eq!(scheduler.worker_count(), 2);
        assert!(scheduler.is_main_thread());

        let name = Arc::new(parking_lot::Mutex::new(None));
        let h = {
            let name = Arc::clone(&name);
            scheduler.create_with("whoami", move || {
                *name.lock() = thread::current().name().map(str::to_string);
            })?
        };
        scheduler.run(h)?;
        scheduler.wait(h)?;

        // Either a worker or the helping main thread ran it.
        let seen = name.lock().clone().unwrap_or_default();
        assert!(
            seen.starts_with("tasksched-worker-") || seen == "test-body",
            "unexpected thread name {seen:?}"
        );
        scheduler.shutdown()
    })
    .unwrap();
}

#[test]
fn test_idle_workers_pick_up_late_work() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let hooks = RecordingHooks::new();
        let scheduler = SchedulerConfigBuilder::new()
            .workers(2)
            .park_timeout(Duration::from_secs(60))
            .start_with_hooks(hooks.clone());

        // Workers are parked by now; a push alone must wake one.
        thread::sleep(Duration::from_millis(50));
        let h = scheduler.create_with("late", || {})?;
        scheduler.run(h)?;

        let deadline = Instant::now() + Duration::from_secs(5);
        while hooks.executed_count("late") == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(hooks.threads_for("late").len(), 1);
        assert!(hooks.threads_for("late").iter().all(|&t| t != 0));

        scheduler.release(h)?;
        scheduler.shutdown()
    })
    .unwrap();
}

#[test]
fn test_dropping_scheduler_without_shutdown_stops_workers() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let hooks = RecordingHooks::new();
        let scheduler = SchedulerConfigBuilder::new()
            .workers(2)
            .start_with_hooks(hooks.clone());
        let clone = scheduler.clone();

        // A surviving clone keeps the workers alive.
        drop(scheduler);
        let h = clone.create_with("after-first-drop", || {})?;
        clone.run(h)?;
        clone.wait(h)?;
        assert!(hooks.thread_stops().is_empty());

        drop(clone);

        let expected: BTreeSet<usize> = [1, 2].into_iter().collect();
        let deadline = Instant::now() + Duration::from_secs(5);
        while hooks.thread_stops() != expected && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(hooks.thread_stops(), expected);
        Ok(())
    })
    .unwrap();
}
