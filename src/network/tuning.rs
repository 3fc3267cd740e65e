use crate::logger::LogSink;

use super::types::Connection;

/// Best-effort low-latency setting for one leg.
///
/// Returns whether the setting was applied. A connection without the
/// capability, or a socket that refuses it, is left as it is.
pub fn apply_no_delay(conn: &dyn Connection, log: &dyn LogSink) -> bool {
    match conn.no_delay() {
        Some(nd) => match nd.set_nodelay(true) {
            Ok(()) => true,
            Err(e) => {
                log.debug(format_args!("Could not disable Nagle's algorithm: {}", e));
                false
            }
        },
        None => false,
    }
}
