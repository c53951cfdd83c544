/*!
Logging setup for the command line tools
*/
use tracing_subscriber::EnvFilter;

/// The default log level for a number of `-v` flags
pub fn level_for(verbosity: u64) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install a subscriber logging to stderr.
///
/// `RUST_LOG` takes precedence over the verbosity level when set.
pub fn init(verbosity: u64) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));
    // A subscriber may already be installed, e.g. by a test harness
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
