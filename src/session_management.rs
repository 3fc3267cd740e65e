//! Session management core module.
//!
//! A session pairs one accepted local connection with its remote peer and
//! runs three concurrent activities over it: two directional copy loops and a
//! periodic stats monitor. Whichever copy loop ends first closes the session
//! through the [`close_coordinator::CloseCoordinator`].

/// Single-fire close signal shared by a session's activities.
pub mod close_coordinator;
/// Periodic stats reporting.
pub mod monitor;
/// Session orchestration: dial, relay, close, report.
pub mod session;


pub use close_coordinator::CloseCoordinator;
pub use session::{ProxySession, SessionReport};
