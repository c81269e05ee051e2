use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::config::DEFAULT_LOG_LEVEL;

/// Installs a JSON subscriber for CloudWatch. Timestamps are left to CloudWatch.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(log_level: &str) {
    let (filter, rejected) = resolve_filter(log_level);
    let installed = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init()
        .is_ok();

    if let (true, Some(error)) = (installed, rejected) {
        warn!(
            component = "runtime",
            log_level,
            error = %error,
            "Invalid log level, falling back to {DEFAULT_LOG_LEVEL}"
        );
    }
}

fn resolve_filter(log_level: &str) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(log_level) {
        Ok(filter) => (filter, None),
        Err(error) => (EnvFilter::new(DEFAULT_LOG_LEVEL), Some(error.to_string())),
    }
}
