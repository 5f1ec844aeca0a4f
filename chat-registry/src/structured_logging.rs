//! Logging setup for processes embedding the chat registry
//!
//! By default logs go to stderr filtered by `RUST_LOG`. Development mode writes
//! everything at DEBUG and above to [`constants::dev_log_path`] instead.

use std::fs::OpenOptions;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::constants;

/// Install the global tracing subscriber.
///
/// Returns the appender guard in dev-log mode; keep it alive for as long as
/// logs should be flushed. Fails if a global subscriber is already installed.
pub fn init_tracing(
    enable_dev_log: bool,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    if enable_dev_log {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(constants::dev_log_path())?;

        let (file_writer, guard) = tracing_appender::non_blocking(file);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_filter(tracing_subscriber::filter::LevelFilter::DEBUG),
            )
            .try_init()?;

        eprintln!(
            "Development logging enabled - writing to {} (PID: {})",
            constants::dev_log_path(),
            std::process::id()
        );

        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(tracing_subscriber::EnvFilter::from_default_env()),
            )
            .try_init()?;

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error_not_a_panic() {
        // Another test may have installed a subscriber first; either way the
        // second call must fail cleanly.
        let _ = init_tracing(false);
        assert!(init_tracing(false).is_err());
    }
}
