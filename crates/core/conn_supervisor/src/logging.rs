//! Ambient logging setup shared by every binary embedding this workspace.
//!
//! Mirrors the teacher's `initialise_tracing_subscriber`: a `tracing_subscriber::fmt` layer
//! that also reports events emitted through the `log` facade (`conn_actors`, `conn_client` and
//! friends all log through `log::{debug,info,warn,error}`), timestamped in UTC.

use time::format_description::well_known::Rfc3339;
use tracing_subscriber::fmt::time::UtcTime;

/// Initialize the process-wide `tracing_subscriber`.
///
/// If `debug` is `false` only `error!`, `warn!` and `info!` are reported; if `true`, `debug!`
/// and `trace!` are reported too.
pub fn initialise_tracing_subscriber(debug: bool) {
    let log_level = if debug { tracing::Level::TRACE } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_timer(UtcTime::new(Rfc3339))
        .with_max_level(log_level)
        .init();
}
