//! Helpers shared by the unit tests.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

/// Installs a test-captured tracing subscriber once per test binary.
///
/// Honours `RUST_LOG`; defaults to `inpage_bridge=debug`.
pub(crate) fn init_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("inpage_bridge=debug"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}
