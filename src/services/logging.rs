//! Structured logging setup.
//!
//! Database-persisted logs and log subscriptions are out of scope here —
//! the core's Non-goals explicitly exclude everything beyond the query
//! surface itself — so this is plain `tracing_subscriber` wiring: an
//! env-filterable layer writing structured JSON to stdout, the shape the
//! rest of the stack already logs through (`tracing::info!`/`warn!`
//! throughout `services::manager`).

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber. Call once, early in `main`.
/// Honors `RUST_LOG`; defaults to `info` for this crate and `tower_http`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("king_phisher_graphql=info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
