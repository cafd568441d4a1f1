use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Debug builds log human-readable lines, release builds log JSON. The
/// filter comes from `RUST_LOG` and falls back to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true);
    if cfg!(debug_assertions) {
        builder.with_target(true).init();
    } else {
        builder.json().init();
    }
}
