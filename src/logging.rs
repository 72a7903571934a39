//! Tracing setup (SPEC_FULL.md §1): `tracing-subscriber` with an
//! env-filter, the way the teacher wires up `tracing`/`tracing-subscriber`
//! throughout (`flight_tracker/`, `packet_processors/`) rather than a
//! bespoke logging crate.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global tracing subscriber. `RUST_LOG` overrides the
/// default filter (`info` for this crate, `warn` for dependencies).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,aireyes=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
