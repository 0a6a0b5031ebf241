pub mod builders;
pub mod hooks;

use std::sync::Once;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=tasksched=trace cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .with_thread_names(true)
            .init();
    });
}

/// Run `f` on a helper thread and panic if it does not finish within
/// `limit`.
///
/// A deadlocked scheduler otherwise hangs the whole test binary. `f` must
/// not care which thread it runs on, so build any main-thread-bound
/// scheduler inside it.
pub fn with_timeout<F, T>(limit: Duration, f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("test-body".to_string())
        .spawn(move || {
            let _ = tx.send(f());
        })
        .expect("failed to spawn test body thread");

    match rx.recv_timeout(limit) {
        Ok(value) => value,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("Test timed out after {limit:?}")
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            panic!("Test body panicked")
        }
    }
}

/// Default limit used by [`with_timeout`] callers.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);
