use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

/// Capability to switch off send coalescing (Nagle's algorithm).
pub trait NoDelay {
    fn set_nodelay(&self, nodelay: bool) -> io::Result<()>;
}

impl NoDelay for TcpStream {
    fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        TcpStream::set_nodelay(self, nodelay)
    }
}

/// A byte stream a session can relay, plus optional capabilities that only
/// some transports have.
pub trait Connection: AsyncRead + AsyncWrite + Send + Unpin {
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn no_delay(&self) -> Option<&dyn NoDelay> {
        None
    }
}

pub type BoxedConnection = Box<dyn Connection>;

impl Connection for TcpStream {
    fn peer_addr(&self) -> Option<SocketAddr> {
        TcpStream::peer_addr(self).ok()
    }

    fn no_delay(&self) -> Option<&dyn NoDelay> {
        Some(self)
    }
}

// A TLS-unwrapped remote leg keeps the addressing and tuning of its socket.
impl Connection for TlsStream<TcpStream> {
    fn peer_addr(&self) -> Option<SocketAddr> {
        self.get_ref().0.peer_addr().ok()
    }

    fn no_delay(&self) -> Option<&dyn NoDelay> {
        Some(self.get_ref().0)
    }
}

impl Connection for DuplexStream {}

/// Renders an optional address for log lines.
pub fn display_addr(addr: Option<SocketAddr>) -> String {
    addr.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn tcp_stream_exposes_capabilities() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let _server = listener.accept().await.unwrap();

        let conn: BoxedConnection = Box::new(client);
        assert_eq!(conn.peer_addr(), Some(addr));
        let nd = conn.no_delay().expect("tcp supports nodelay");
        nd.set_nodelay(true).unwrap();
    }

    #[test]
    fn duplex_stream_has_no_capabilities() {
        let (a, _b) = tokio::io::duplex(64);
        let conn: BoxedConnection = Box::new(a);
        assert!(conn.peer_addr().is_none());
        assert!(conn.no_delay().is_none());
        assert_eq!(display_addr(conn.peer_addr()), "-");
    }
}
