//! Network layer: accepting local connections, dialing the remote peer and
//! the connection abstraction both sides share.

pub mod dial;
pub mod network_listener;
pub mod tuning;
pub mod types;

pub use dial::RemoteTarget;
pub use network_listener::NetworkListener;
pub use types::{BoxedConnection, Connection};
