//! Logging setup and pipeline instrumentation
//!
//! Library code only emits `tracing` events. Binaries call
//! [`init_with_config`] once to install a `tracing-subscriber` registry.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is not set (e.g. "warn,ddsforge=debug")
    pub default_level: String,
    /// Show the target (module path) in log output
    pub show_target: bool,
    /// Show thread IDs in log output
    pub show_thread_ids: bool,
    /// Show source file and line in log output
    pub show_location: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: "warn,ddsforge=info".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_location: false,
        }
    }
}

impl TracingConfig {
    /// Config for a CLI verbosity count (`-v`, `-vv`, ...)
    pub fn from_verbosity(verbose: u8) -> Self {
        let default_level = match verbose {
            0 => "warn,ddsforge=info",
            1 => "info,ddsforge=debug",
            2 => "debug",
            _ => "trace",
        };
        Self {
            default_level: default_level.to_string(),
            // rayon workers show up once faces build in parallel
            show_thread_ids: verbose >= 2,
            show_location: verbose >= 3,
            ..Self::default()
        }
    }
}

/// Initialize tracing with a custom configuration
///
/// Only the first call installs a subscriber; later calls return `false`.
#[cfg(feature = "tracing")]
pub fn init_with_config(config: &TracingConfig) -> bool {
    if TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_err()
    {
        return false;
    }

    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_location)
        .with_line_number(config.show_location);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .is_ok()
}

/// Mark tracing as initialized; without the `tracing` feature there is no subscriber
#[cfg(not(feature = "tracing"))]
pub fn init_with_config(_config: &TracingConfig) -> bool {
    TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_ok()
}

/// Initialize tracing with the default configuration
pub fn init_default() -> bool {
    init_with_config(&TracingConfig::default())
}

/// Run one pipeline stage inside a span and log how long it took
pub fn instrument_stage<T, F>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = tracing::info_span!("stage", stage = %name);
    let _guard = span.enter();

    let start = std::time::Instant::now();
    let result = f();
    let duration = start.elapsed();

    tracing::debug!(duration_ms = %duration.as_millis(), "Stage complete");

    result
}
