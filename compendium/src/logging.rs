//! Logging setup for the command-line front end.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays clean.
///
/// `RUST_LOG` wins over the verbosity flag when set.
pub fn init_logging(verbosity: u8) {
    // 0 = warnings only
    // 1 (-v) = login and search progress
    // 2+ (-vv) = every request and cookie
    let filter = match verbosity {
        0 => "warn",
        1 => "warn,compendium=info",
        _ => "info,compendium=debug",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();
}
