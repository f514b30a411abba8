use tracing_subscriber::{fmt, EnvFilter};

/// Installs the process-wide tracing subscriber. Hosts embedding this crate
/// into a larger pipeline will usually install their own instead.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .try_init();
}

/* ---------------- Tests ---------------- */
