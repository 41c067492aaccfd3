pub mod builders;
pub mod process;

use std::sync::Once;
use std::time::{Duration, Instant};

use tracing_subscriber::{fmt, EnvFilter};
use wado::exec::SharedBuffer;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Poll `buf` until `pred` holds on its contents or `limit` elapses.
/// Returns whether the predicate was satisfied.
pub async fn wait_for_output<P>(buf: &SharedBuffer, limit: Duration, pred: P) -> bool
where
    P: Fn(&str) -> bool,
{
    let deadline = Instant::now() + limit;
    loop {
        if pred(&buf.contents()) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait until `buf` grows beyond its current length.
pub async fn wait_for_change(buf: &SharedBuffer, limit: Duration) -> bool {
    let start = buf.len();
    wait_for_output(buf, limit, |s| s.len() > start).await
}

/// Wait until `buf` has not grown for `quiet`. Returns `false` if output is
/// still changing when `limit` elapses.
pub async fn wait_for_stabilize(buf: &SharedBuffer, quiet: Duration, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    let mut last_len = buf.len();
    let mut last_change = Instant::now();
    loop {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let len = buf.len();
        if len != last_len {
            last_len = len;
            last_change = Instant::now();
        } else if last_change.elapsed() >= quiet {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
    }
}
