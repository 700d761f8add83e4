pub mod fixture;
pub mod recorder;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

pub use fixture::ScopeFixture;
pub use recorder::{FaultLog, RecordedFault, Recorder};

/// Upper bound for async tests driving the Tokio timer backend.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Install a test-scoped tracing subscriber once per test binary.
///
/// Output goes through the harness capture, so it only shows for failing
/// tests. The default filter keeps `scopewatch` at `warn` and silences
/// everything else. Override with `RUST_LOG`, e.g. `RUST_LOG=scopewatch=trace`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("off,scopewatch=warn"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `fut`, failing the test if it does not finish within
/// [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(fut: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, fut).await {
        Ok(value) => value,
        Err(_) => panic!("test did not finish within {TEST_TIMEOUT:?}"),
    }
}
