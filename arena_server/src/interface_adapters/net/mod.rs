// Network adapter modules split by external client sockets vs internal HTTP routes.

pub mod client;
pub mod internal;
pub mod outbound;
pub mod ping;
pub mod tracker;

pub use client::ws_handler;
pub use internal::{create_world_handler, world_status_handler};
pub use tracker::ConnectionTracker;

use std::time::{Duration, Instant};

/// Minimum spacing between repeated per-connection warnings.
pub(crate) const LOG_THROTTLE: Duration = Duration::from_secs(2);

pub(crate) fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// A throttle stamp that allows the first log immediately.
pub(crate) fn throttle_start() -> Instant {
    let now = Instant::now();
    now.checked_sub(LOG_THROTTLE).unwrap_or(now)
}
