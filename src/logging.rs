//! Logging setup (tracing to stderr).

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// Default level for a `-v` count: 0 = info, 1 = debug, 2+ = trace
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the verbosity flag. Logs go to stderr so
/// HUD output on stdout stays clean. Calling twice is harmless: the second
/// call leaves the first subscriber in place.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for_verbosity(verbosity).into())
        .from_env_lossy();

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    if tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: logging already initialised");
    }
}
