//! Logging setup and the error-logging boundary used by the binary.

use std::fmt::Display;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Call once, at process start.
pub fn init_logging() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();
}

/// Run `f`, logging a failure under `operation` before handing it back.
pub fn log_failure<T, E, F>(operation: &str, f: F) -> Result<T, E>
where
    E: Display,
    F: FnOnce() -> Result<T, E>,
{
    f().inspect_err(|e| error!(operation, "{e}"))
}
