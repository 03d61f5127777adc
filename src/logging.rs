use tracing_subscriber::{EnvFilter, fmt};

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set. Otherwise each `-v` raises this crate's level
/// from `warn` through `info` and `debug` to `trace`.
pub fn init(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,bf_engine={level}")));

    // A subscriber may already be installed
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
