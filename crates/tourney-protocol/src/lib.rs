//! Wire formats for talking to chess engines.
//!
//! Two text-line protocols are supported: UCI and the older xboard (CECP)
//! protocol. This crate is purely about encoding and decoding lines; it
//! owns no processes and does no I/O. The [`uci`] and [`xboard`] modules
//! each provide outbound command builders and an inbound line parser
//! producing typed messages; [`options`] holds the engine option model
//! shared by both.
//!
//! # Modules
//!
//! - [`uci`] - UCI command builders and engine message parsing
//! - [`xboard`] - CECP command builders, `feature` negotiation, inbound parsing
//! - [`options`] - engine option declarations and overrides
//! - [`info`] - `info` line search telemetry

pub mod info;
pub mod options;
pub mod uci;
pub mod xboard;

pub use info::SearchInfo;
pub use options::{EngineOption, OptionKind};

use thiserror::Error;

/// Errors produced while decoding engine output.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A line that looked like a known command but could not be decoded.
    #[error("malformed {kind} line: {line}")]
    Malformed {
        /// Which command family failed to decode.
        kind: &'static str,
        /// The offending input line.
        line: String,
    },
}

/// Which wire protocol an engine speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Universal Chess Interface.
    Uci,
    /// Chess Engine Communication Protocol (xboard / winboard).
    Xboard,
}

impl Protocol {
    /// The greeting token that starts the handshake for this protocol.
    pub fn greeting(self) -> &'static str {
        match self {
            Protocol::Uci => "uci",
            Protocol::Xboard => "xboard",
        }
    }
}

/// Search limits for one `go`, independent of wire format.
///
/// The clock variant carries milliseconds; adapters convert to whatever
/// unit their protocol expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoSpec {
    /// Search until told to stop.
    Infinite,
    /// Search to a fixed depth in plies.
    Depth(u32),
    /// Fixed milliseconds per move.
    MoveTime(u64),
    /// Tournament clock state.
    Clock {
        /// White's remaining time in milliseconds.
        wtime_ms: u64,
        /// Black's remaining time in milliseconds.
        btime_ms: u64,
        /// White's increment per move in milliseconds.
        winc_ms: u64,
        /// Black's increment per move in milliseconds.
        binc_ms: u64,
        /// Moves left in the current time-control period, if periodic.
        movestogo: Option<u32>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_tokens() {
        assert_eq!(Protocol::Uci.greeting(), "uci");
        assert_eq!(Protocol::Xboard.greeting(), "xboard");
    }
}
