//! # Network Listener Module
//!
//! This module accepts local TCP connections and hands each one to its own
//! [`ProxySession`], spawned as an independent task.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │ Incoming        │───▶│ NetworkListener  │───▶│ ProxySession    │
//! │ Connections     │    │                  │    │ (one task each) │
//! └─────────────────┘    │ - accept loop    │    └────────┬────────┘
//!                        │ - connection ids │             │ dial
//!                        └──────────────────┘             ▼
//!                                                  remote peer (TCP/TLS)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tcp_relay::configuration::SessionConfig;
//! use tcp_relay::network::network_listener::NetworkListener;
//! use tcp_relay::error_handling::types::NetworkError;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), NetworkError> {
//!     let config = SessionConfig::new(
//!         "127.0.0.1:9999".parse().unwrap(),
//!         "127.0.0.1:8000".parse().unwrap(),
//!     );
//!     let listener = NetworkListener::bind(Arc::new(config)).await?;
//!     listener.start_listening().await
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use log::{info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::configuration::types::SessionConfig;
use crate::error_handling::types::{NetworkError, SessionError};
use crate::logger::ConnectionLogger;
use crate::session_management::session::{ProxySession, SessionReport};

/// Accept loop of the relay.
///
/// `NetworkListener` is responsible for:
/// - Binding the local address from the session configuration
/// - Numbering accepted connections, starting at 1
/// - Spawning one [`ProxySession`] per connection so that a slow dial or a
///   stalled peer never delays the next `accept`
#[derive(Debug)]
pub struct NetworkListener {
    /// Bound listening socket
    listener: TcpListener,

    /// Settings shared read-only by every session
    config: Arc<SessionConfig>,

    /// Id of the last accepted connection
    connection_id: u64,
}

impl NetworkListener {
    /// Binds the configured local address.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindError`] if the address is in use or not
    /// permitted.
    pub async fn bind(config: Arc<SessionConfig>) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(config.local_addr)
            .await
            .map_err(NetworkError::BindError)?;
        Ok(Self {
            listener,
            config,
            connection_id: 0,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.listener.local_addr().map_err(NetworkError::BindError)
    }

    /// Accepts connections forever.
    ///
    /// A failed `accept` is logged and the loop goes on; it never ends the
    /// listener. Nothing a session does is awaited here.
    pub async fn start_listening(mut self) -> Result<(), NetworkError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    self.handle_connection(stream);
                }
                Err(e) => {
                    warn!("Failed to accept connection '{}'", NetworkError::AcceptError(e));
                }
            }
        }
    }

    /// Starts the session of one accepted connection on its own task.
    fn handle_connection(
        &mut self,
        stream: TcpStream,
    ) -> JoinHandle<Result<SessionReport, SessionError>> {
        self.connection_id += 1;
        if self.config.tls_unwrap() {
            info!("Unwrapping TLS enable");
        }

        let log = Arc::new(ConnectionLogger::new(
            self.connection_id,
            self.config.debug,
            self.config.verbose,
        ));
        let session = ProxySession::new(Box::new(stream), Arc::clone(&self.config), log);
        tokio::spawn(session.start())
    }
}
