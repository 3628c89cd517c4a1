//! Logging setup: a `tracing` subscriber with an env-driven filter.
//!
//! `RUST_LOG` controls verbosity (`info` when unset). Handlers annotate
//! themselves with `#[instrument]`, and the HTTP layer adds per-request
//! spans via `tower-http`'s `TraceLayer`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .init();
}
