//! # Structured Logging Module
//!
//! Environment-aware structured logging. Output goes to stderr: stdout carries
//! the check's own report, which monitoring systems parse.

use chrono::Utc;
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::env;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging.
///
/// The filter comes from `NSCHECK_LOG` when set, otherwise from the detected
/// environment, raised to `debug` when `verbose` is requested. Set
/// `NSCHECK_LOG_FORMAT=json` for JSON lines. Safe to call more than once.
pub fn init_structured_logging(verbose: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = std::env::var(env::LOG_FILTER)
            .unwrap_or_else(|_| get_log_level(&environment, verbose).to_string());
        let json = std::env::var(env::LOG_FORMAT)
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let layer = if json {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_names(true)
                .json()
                .with_filter(EnvFilter::new(&filter))
                .boxed()
        } else {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_names(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new(&filter))
                .boxed()
        };

        // Use try_init to avoid panic if global subscriber already set
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::debug!(
            environment = %environment,
            filter = %filter,
            json,
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var(env::ENVIRONMENT).unwrap_or_else(|_| "production".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str, verbose: bool) -> &'static str {
    match (environment, verbose) {
        ("test" | "development", _) => "debug",
        (_, true) => "info",
        _ => "warn",
    }
}

/// Log the completion of one fan-out wave
pub fn log_wave_operation(wave: &str, submitted: usize, produced: usize, elapsed: Duration) {
    tracing::info!(
        wave = %wave,
        submitted,
        produced,
        elapsed_ms = elapsed.as_millis() as u64,
        timestamp = %Utc::now().to_rfc3339(),
        "Wave complete"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "Check error"
    );
}
