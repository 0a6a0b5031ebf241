// tests/main_thread.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use tasksched::errors::SchedulerError;
use tasksched::{EXTERNAL_THREAD_INDEX, MAIN_THREAD_INDEX, MainQueueBudget};
use tasksched_test_utils::builders::SchedulerConfigBuilder;
use tasksched_test_utils::hooks::RecordingHooks;
use tasksched_test_utils::{TEST_TIMEOUT, init_tracing, with_timeout};

type TestResult = Result<(), SchedulerError>;

#[test]
fn test_main_thread_task_waits_for_execute_main_queue() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let scheduler = SchedulerConfigBuilder::new().workers(4).start();
        let ran = Arc::new(AtomicBool::new(false));

        let h = {
            let ran = Arc::clone(&ran);
            scheduler.create_with("main-only", move || ran.store(true, Ordering::SeqCst))?
        };
        scheduler.run_on_main_thread(h)?;

        // Workers never touch the main queue.
        thread::sleep(Duration::from_millis(20));
        assert!(!ran.load(Ordering::SeqCst));
        assert!(!scheduler.is_completed(h)?);

        assert_eq!(scheduler.execute_main_queue(None)?, 1);
        assert!(ran.load(Ordering::SeqCst));
        assert!(scheduler.is_completed(h)?);
        scheduler.shutdown()
    })
    .unwrap();
}

#[test]
fn test_main_thread_tasks_only_run_on_main_thread_index() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let hooks = RecordingHooks::new();
        let scheduler = SchedulerConfigBuilder::new()
            .workers(4)
            .start_with_hooks(hooks.clone());
        let on_main = Arc::new(AtomicUsize::new(0));

        let root = scheduler.create("frame")?;
        for i in 0..16 {
            let worker_task = scheduler.create_as_child(root, format!("work-{i}"), || {})?;
            scheduler.run(worker_task)?;

            let sched = scheduler.clone();
            let on_main = Arc::clone(&on_main);
            let main_task = scheduler.create_as_child(root, "upload", move || {
                if sched.is_main_thread() {
                    on_main.fetch_add(1, Ordering::SeqCst);
                }
            })?;
            scheduler.run_on_main_thread(main_task)?;
        }
        scheduler.run(root)?;

        // A main-thread wait drains the main queue while it waits.
        scheduler.wait(root)?;
        scheduler.shutdown()?;

        assert_eq!(on_main.load(Ordering::SeqCst), 16);
        let threads = hooks.threads_for("upload");
        assert_eq!(threads.len(), 16);
        assert!(threads.iter().all(|&t| t == MAIN_THREAD_INDEX), "{threads:?}");
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_worker_tasks_report_worker_indices() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let hooks = RecordingHooks::new();
        let scheduler = SchedulerConfigBuilder::new()
            .workers(3)
            .start_with_hooks(hooks.clone());

        let root = scheduler.create("root")?;
        for i in 0..64 {
            let child = scheduler.create_as_child(root, format!("w{i}"), || {
                thread::sleep(Duration::from_micros(50));
            })?;
            scheduler.run(child)?;
        }
        scheduler.run(root)?;
        scheduler.wait(root)?;
        scheduler.shutdown()?;

        // The waiting main thread may help, so index 0 is allowed too.
        for exec in hooks.executions() {
            assert!(exec.thread_index <= 3, "unexpected index in {exec:?}");
        }
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_execute_main_queue_respects_task_budget() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let scheduler = SchedulerConfigBuilder::new()
            .main_budget(MainQueueBudget::Tasks(3))
            .start();
        let count = Arc::new(AtomicUsize::new(0));

        for i in 0..8 {
            let count = Arc::clone(&count);
            let h = scheduler.create_with(format!("m{i}"), move || {
                count.fetch_add(1, Ordering::SeqCst);
            })?;
            scheduler.run_on_main_thread(h)?;
        }

        assert_eq!(scheduler.pump_main_queue()?, 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.stats().queued_main, 5);

        assert_eq!(scheduler.execute_main_queue(Some(MainQueueBudget::Tasks(2)))?, 2);
        assert_eq!(scheduler.execute_main_queue(None)?, 3);
        assert_eq!(count.load(Ordering::SeqCst), 8);
        assert_eq!(scheduler.execute_main_queue(None)?, 0);
        scheduler.shutdown()
    })
    .unwrap();
}

#[test]
fn test_execute_main_queue_time_budget_stops_early() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let scheduler = SchedulerConfigBuilder::new().start();

        for i in 0..10 {
            let h = scheduler.create_with(format!("slow-{i}"), || {
                thread::sleep(Duration::from_millis(5));
            })?;
            scheduler.run_on_main_thread(h)?;
        }

        let budget = MainQueueBudget::Time(Duration::from_millis(12));
        let first = scheduler.execute_main_queue(Some(budget))?;
        assert!(first >= 1 && first < 10, "ran {first} tasks");

        let rest = scheduler.execute_main_queue(None)?;
        assert_eq!(first + rest, 10);
        scheduler.shutdown()
    })
    .unwrap();
}

#[test]
fn test_execute_main_queue_from_other_thread_is_rejected() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let scheduler = SchedulerConfigBuilder::new().start();
        let sched = scheduler.clone();

        let (result, index) = thread::spawn(move || {
            (sched.execute_main_queue(None), sched.current_thread_index())
        })
        .join()
        .expect("helper thread panicked");

        assert!(matches!(result, Err(SchedulerError::NotMainThread)));
        assert_eq!(index, EXTERNAL_THREAD_INDEX);
        assert_eq!(scheduler.current_thread_index(), MAIN_THREAD_INDEX);
        scheduler.shutdown()
    })
    .unwrap();
}

#[test]
fn test_main_queue_task_can_spawn_more_main_work() {
    init_tracing();
    with_timeout(TEST_TIMEOUT, || -> TestResult {
        let scheduler = SchedulerConfigBuilder::new().start();
        let second_ran = Arc::new(AtomicBool::new(false));

        let first = {
            let sched = scheduler.clone();
            let second_ran = Arc::clone(&second_ran);
            scheduler.create_with("first", move || -> TestResult {
                let h = sched.create_with("second", move || {
                    second_ran.store(true, Ordering::SeqCst)
                })?;
                sched.run_on_main_thread(h)
            })?
        };
        scheduler.run_on_main_thread(first)?;

        // An unbounded drain also runs tasks queued by the drained tasks.
        assert_eq!(scheduler.execute_main_queue(None)?, 2);
        assert!(second_ran.load(Ordering::SeqCst));
        scheduler.shutdown()
    })
    .unwrap();
}
