//! Establishes the remote leg of a session, either as a plain TCP stream or
//! as a TLS client whose decrypted side is relayed.

use std::net::SocketAddr;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::error_handling::types::DialError;

use super::types::BoxedConnection;

/// How the remote peer is reached.
#[derive(Clone)]
pub enum RemoteTarget {
    Plain(SocketAddr),
    Tls {
        /// `host:port`, the host also being the SNI name.
        address: String,
        connector: TlsConnector,
    },
}

impl RemoteTarget {
    pub async fn dial(&self) -> Result<BoxedConnection, DialError> {
        match self {
            RemoteTarget::Plain(addr) => {
                let stream = TcpStream::connect(addr).await.map_err(DialError::Connect)?;
                Ok(Box::new(stream))
            }
            RemoteTarget::Tls { address, connector } => {
                let server_name = server_name(address)?;
                let stream = TcpStream::connect(address.as_str())
                    .await
                    .map_err(DialError::Connect)?;
                let tls = connector
                    .connect(server_name, stream)
                    .await
                    .map_err(DialError::TlsHandshake)?;
                Ok(Box::new(tls))
            }
        }
    }
}

impl std::fmt::Debug for RemoteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteTarget::Plain(addr) => f.debug_tuple("Plain").field(addr).finish(),
            RemoteTarget::Tls { address, .. } => {
                f.debug_struct("Tls").field("address", address).finish()
            }
        }
    }
}

impl std::fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteTarget::Plain(addr) => write!(f, "{}", addr),
            RemoteTarget::Tls { address, .. } => write!(f, "{}", address),
        }
    }
}

/// Client connector trusting the bundled web PKI roots.
pub fn default_tls_connector() -> Result<TlsConnector, DialError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    tls_connector_with_roots(roots)
}

/// Client connector trusting exactly `roots`.
pub fn tls_connector_with_roots(roots: RootCertStore) -> Result<TlsConnector, DialError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| DialError::TlsHandshake(std::io::Error::other(e)))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

/// Host part of a `host:port` address, usable as a TLS server name.
pub fn server_name(address: &str) -> Result<ServerName<'static>, DialError> {
    let host = match address.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => address,
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    ServerName::try_from(host.to_string())
        .map_err(|e| DialError::InvalidServerName(format!("{} ({})", host, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn server_name_strips_port_and_brackets() {
        assert_eq!(
            server_name("example.com:443").unwrap(),
            ServerName::try_from("example.com").unwrap()
        );
        assert!(matches!(server_name("[::1]:8443").unwrap(), ServerName::IpAddress(_)));
        assert!(matches!(server_name("10.0.0.1:443").unwrap(), ServerName::IpAddress(_)));
        assert!(server_name("bad host:443").is_err());
    }

    #[tokio::test]
    async fn plain_dial_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut s, _) = listener.accept().await.unwrap();
            s.write_all(b"hi").await.unwrap();
        });

        let mut conn = RemoteTarget::Plain(addr).dial().await.unwrap();
        assert_eq!(conn.peer_addr(), Some(addr));
        let mut buf = [0u8; 2];
        conn.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hi");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn plain_dial_reports_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = RemoteTarget::Plain(addr).dial().await.err().unwrap();
        assert!(matches!(err, DialError::Connect(_)));
    }

    #[test]
    fn default_connector_builds() {
        assert!(default_tls_connector().is_ok());
    }
}
