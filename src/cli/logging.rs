//! Logging initialization

/// Initialize logging based on debug flag.
///
/// Diagnostics go to stderr so progress lines own stdout. Silent unless
/// `--debug` is given; `RUST_LOG` overrides the default filter.
pub fn init_logging(debug: bool) {
    if !debug {
        return;
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_target(true)
        .init();
}
