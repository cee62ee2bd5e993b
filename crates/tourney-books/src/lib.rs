//! Opening book loading and per-game draw selection.
//!
//! Three reader formats are supported: EPD (one FEN per line), PGN (one
//! opening line per game) and the binary Polyglot format. A
//! [`BookManager`] owns any number of loaded books plus the selection
//! policy deciding which games share an opening.
//!
//! # Modules
//!
//! - [`epd`] - EPD text books
//! - [`pgn`] - PGN text books and SAN move-list parsing
//! - [`polyglot`] - Polyglot binary books
//! - [`manager`] - book selection across a tournament

pub mod epd;
pub mod manager;
pub mod pgn;
pub mod polyglot;

pub use manager::{BookKind, BookManager, BookSelect, BooksSetup, BookSpec};

use thiserror::Error;

/// Errors raised while loading a book file.
#[derive(Error, Debug)]
pub enum BookError {
    /// The book file could not be read.
    #[error("failed to read book {path}: {source}")]
    Io {
        /// Path of the offending file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A Polyglot file whose length is not a multiple of the record size,
    /// or whose keys are not sorted ascending.
    #[error("invalid polyglot book {path}: {detail}")]
    InvalidPolyglot {
        /// Path of the offending file.
        path: String,
        /// What check failed.
        detail: String,
    },
}

/// What a book draw yields: a starting position, a move prefix, or both.
///
/// `fen: None` means the standard initial position. Moves are coordinate
/// strings; the game replays and validates them before use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Opening {
    /// Starting position, or `None` for the standard start.
    pub fen: Option<String>,
    /// Opening move prefix in coordinate notation.
    pub moves: Vec<String>,
}

impl Opening {
    /// Whether this draw carries neither a position nor moves.
    pub fn is_empty(&self) -> bool {
        self.fen.is_none() && self.moves.is_empty()
    }
}
