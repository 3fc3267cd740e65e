//! Common data types used across the relay subsystem.

use std::fmt;
use std::io;

/// Direction of flow for relayed bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local client to remote peer; counted as sent.
    Outbound,
    /// Remote peer back to the local client; counted as received.
    Inbound,
}

impl Direction {
    /// Arrow used in log framing.
    pub fn arrow(self) -> &'static str {
        match self {
            Direction::Outbound => ">>>",
            Direction::Inbound => "<<<",
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Direction::Outbound => "sent",
            Direction::Inbound => "received",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => write!(f, "outbound"),
            Direction::Inbound => write!(f, "inbound"),
        }
    }
}

/// Why a copy loop stopped. The first one to reach the close coordinator
/// becomes the session's close reason.
#[derive(Debug)]
pub enum LoopEnd {
    /// Orderly end of stream on the source.
    Eof(Direction),
    ReadFailed(Direction, io::Error),
    WriteFailed(Direction, io::Error),
    /// The loop task ended without reporting, e.g. a stage panicked.
    Aborted(Direction),
}

impl LoopEnd {
    pub fn direction(&self) -> Direction {
        match self {
            LoopEnd::Eof(d)
            | LoopEnd::ReadFailed(d, _)
            | LoopEnd::WriteFailed(d, _)
            | LoopEnd::Aborted(d) => *d,
        }
    }
}

impl fmt::Display for LoopEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopEnd::Eof(d) => write!(f, "{} end of stream", d),
            LoopEnd::ReadFailed(d, e) => write!(f, "{} read failed '{}'", d, e),
            LoopEnd::WriteFailed(d, e) => write!(f, "{} write failed '{}'", d, e),
            LoopEnd::Aborted(d) => write!(f, "{} copy loop aborted", d),
        }
    }
}
