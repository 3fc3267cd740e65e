//! Byte relaying between the two legs of a session.

pub mod pipe;
pub mod stats;
pub mod types;

pub use pipe::{pipe, PipeOptions};
pub use stats::{format_bytes, SessionStats, StatsSnapshot};
pub use types::{Direction, LoopEnd};
