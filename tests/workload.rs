// tests/workload.rs

use tasksched::TracingHooks;
use tasksched::config::WorkloadSection;
use tasksched::workload::{expected_sum, run_workload};
use tasksched_test_utils::builders::SchedulerConfigBuilder;
use tasksched_test_utils::{TEST_TIMEOUT, init_tracing, with_timeout};

#[test]
fn test_workload_finalizes_on_main_thread() {
    init_tracing();
    let report = with_timeout(TEST_TIMEOUT, || {
        let scheduler = SchedulerConfigBuilder::new()
            .workers(3)
            .start_with_hooks(std::sync::Arc::new(TracingHooks));
        let cfg = WorkloadSection {
            items: 10_000,
            chunk: 333,
            main_thread_finalize: true,
            frame_ms: 2,
        };
        let report = run_workload(&scheduler, &cfg);
        scheduler.shutdown().expect("shutdown failed");
        report.expect("workload failed")
    });

    assert_eq!(report.sum, expected_sum(10_000));
    assert_eq!(report.chunks, 31);
    assert!(report.finalized_on_main);
    assert!(report.frames >= 1);
}

#[test]
fn test_workload_without_finalize_step() {
    init_tracing();
    let report = with_timeout(TEST_TIMEOUT, || {
        let scheduler = SchedulerConfigBuilder::new().workers(2).start();
        let cfg = WorkloadSection {
            items: 1_000,
            chunk: 1_000,
            main_thread_finalize: false,
            frame_ms: 1,
        };
        let report = run_workload(&scheduler, &cfg);
        scheduler.shutdown().expect("shutdown failed");
        report.expect("workload failed")
    });

    assert_eq!(report.sum, expected_sum(1_000));
    assert_eq!(report.chunks, 1);
    assert_eq!(report.main_tasks, 0);
}

#[test]
fn test_expected_sum_matches_closed_form() {
    let n: u64 = 1_000;
    assert_eq!(expected_sum(n as usize), (n - 1) * n * (2 * n - 1) / 6);
    assert_eq!(expected_sum(0), 0);
}
