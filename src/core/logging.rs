//! Logging setup for binaries, benches and tests

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Initialize env_logger, falling back to [`DEFAULT_FILTER`].
///
/// Override with the `RUST_LOG` environment variable.
///
/// # Example
/// ```no_run
/// svodag::core::logging::init();
/// log::info!("Building DAG");
/// ```
pub fn init() {
    init_with_filter(DEFAULT_FILTER);
}

/// Initialize env_logger with a caller-chosen default filter (e.g. `"svodag=debug"`).
pub fn init_with_filter(default_filter: &str) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter)
    )
    .format_timestamp_millis()
    .init();
}

/// Route log output through the test harness. Safe to call from every test.
#[cfg(test)]
pub(crate) fn init_for_tests() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("debug")
    )
    .is_test(true)
    .try_init();
}
