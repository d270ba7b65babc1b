use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Level comes from `RUST_LOG`, default `info`.
///
/// Logs go to stderr so stdout stays free for the rendered tab.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init();
}
