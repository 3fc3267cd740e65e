use std::net::SocketAddr;
use std::time::Duration;

use crate::inspection::Pipeline;
use crate::network::dial::RemoteTarget;
use crate::session_management::monitor::DEFAULT_STATS_INTERVAL;

/// Immutable settings shared by every session of a listener.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Address the acceptor listens on.
    pub local_addr: SocketAddr,
    /// Resolved plain remote address, also used for log lines.
    pub remote_addr: SocketAddr,
    /// How the remote leg is dialled (plain or TLS-unwrapped).
    pub remote: RemoteTarget,
    /// Disable Nagle's algorithm on both legs.
    pub no_delay: bool,
    /// Dump payloads as hex instead of text at trace level.
    pub output_hex: bool,
    pub debug: bool,
    pub verbose: bool,
    pub pipeline: Pipeline,
    pub stats_interval: Duration,
}

impl SessionConfig {
    /// Plain relay to `remote_addr` with every option off.
    pub fn new(local_addr: SocketAddr, remote_addr: SocketAddr) -> Self {
        Self {
            local_addr,
            remote_addr,
            remote: RemoteTarget::Plain(remote_addr),
            no_delay: false,
            output_hex: false,
            debug: false,
            verbose: false,
            pipeline: Pipeline::default(),
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }

    pub fn tls_unwrap(&self) -> bool {
        matches!(self.remote, RemoteTarget::Tls { .. })
    }
}
