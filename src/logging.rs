//! Logging and tracing setup.
//!
//! The library only emits `tracing` events; binaries pick a subscriber here. Filtering
//! follows `RUST_LOG` first and the per-mode default level otherwise.

use std::sync::Once;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

static INIT: Once = Once::new();

/// Output shape of the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable lines with span timings, thread ids and source locations.
    Full,
    /// One JSON object per event, for log shippers.
    Json,
    /// Short stderr lines for the command-line tools.
    Compact,
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn output_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Full => fmt::layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_thread_ids(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
    }
}

/// Install the global subscriber. Only the first call in a process has any effect.
pub fn init(format: LogFormat, default_level: &str) {
    INIT.call_once(|| {
        let installed = tracing_subscriber::registry()
            .with(output_layer(format))
            .with(env_filter(default_level))
            .try_init();
        if installed.is_ok() {
            tracing::debug!(?format, "formatid tracing initialized");
        }
    });
}

/// Full-format logging at `info`.
pub fn init_tracing() {
    init(LogFormat::Full, "info");
}

/// JSON logging at `info`.
pub fn init_tracing_json() {
    init(LogFormat::Json, "info");
}

/// Compact stderr logging for the command-line tools.
///
/// Stdout carries results, so diagnostics always go to stderr. `verbose` raises the
/// default level from `warn` to `debug`.
pub fn init_cli_tracing(verbose: bool) {
    init(LogFormat::Compact, if verbose { "debug" } else { "warn" });
}

/// `info`-level span with optional fields, used around per-file identification.
#[macro_export]
macro_rules! span_trace {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
