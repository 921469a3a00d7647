//! Centralized logging configuration for geofactor binaries
//!
//! Default level is INFO and can be overridden through the `RUST_LOG` environment variable.

use tracing::Level;

/// Initialize the tracing subscriber with geofactor's standard configuration
///
/// # Example
/// ```no_run
/// use geofactor::init_logger;
///
/// fn main() {
///     init_logger();
///     tracing::info!("Application started");
/// }
/// ```
///
/// # Environment Variables
/// ```bash
/// RUST_LOG=debug cargo run --bin velocity_chain
/// RUST_LOG=geofactor=trace cargo run --bin velocity_chain
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Initialize the tracing subscriber with a custom default level
///
/// # Arguments
/// * `default_level` - The default log level (overrideable via RUST_LOG)
pub fn init_logger_with_level(default_level: Level) {
    use tracing_subscriber::fmt::time::SystemTime;

    // try_init: a second call (tests, embedding applications) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_timer(SystemTime)
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}
