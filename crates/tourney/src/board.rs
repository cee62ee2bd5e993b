//! The board seam: chess rules live in `shakmaty`, this wrapper adds the
//! game history, repetition tracking and the terminal-rule check the
//! controller needs.

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::Uci;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};
use thiserror::Error;

use crate::verdict::{EndReason, GameOutcome, Verdict};

/// Errors raised while mutating the board.
#[derive(Error, Debug)]
pub enum BoardError {
    /// A starting FEN that does not describe a legal position.
    #[error("invalid starting position: {0}")]
    BadStartFen(String),
    /// Coordinate text that does not parse or is not legal here.
    #[error("illegal move {mv} in {fen}")]
    IllegalMove {
        /// The offending coordinate text.
        mv: String,
        /// Position it was tried in.
        fen: String,
    },
}

/// One played move as the controller remembers it.
#[derive(Debug, Clone)]
pub struct HistEntry {
    /// Coordinate notation, as sent to engines.
    pub uci: String,
    /// SAN, as printed in PGN.
    pub san: String,
    /// Side that played the move.
    pub side: Color,
    /// Thinking time spent on the move, seconds.
    pub elapsed: f64,
}

/// A position plus the history that produced it.
#[derive(Debug, Clone)]
pub struct Board {
    start_fen: Option<String>,
    pos: Chess,
    history: Vec<HistEntry>,
    /// Zobrist keys of every position reached, current position last.
    keys: Vec<u64>,
}

impl Board {
    /// A fresh game from `start_fen`, or the standard start when `None`.
    pub fn new_game(start_fen: Option<&str>) -> Result<Board, BoardError> {
        let pos = match start_fen {
            None => Chess::default(),
            Some(fen) => fen
                .parse::<Fen>()
                .ok()
                .and_then(|f| f.into_position(CastlingMode::Standard).ok())
                .ok_or_else(|| BoardError::BadStartFen(fen.to_string()))?,
        };
        let key = zobrist(&pos);
        Ok(Board {
            start_fen: start_fen.map(str::to_string),
            pos,
            history: Vec::new(),
            keys: vec![key],
        })
    }

    /// Side to move.
    pub fn side(&self) -> Color {
        self.pos.turn()
    }

    /// Half-moves played since the starting position.
    pub fn ply(&self) -> usize {
        self.history.len()
    }

    /// Whether the game started from the standard initial position.
    pub fn from_origin_position(&self) -> bool {
        self.start_fen.is_none()
    }

    /// The starting FEN, if the game did not begin at the standard start.
    pub fn start_fen(&self) -> Option<&str> {
        self.start_fen.as_deref()
    }

    /// FEN of the current position.
    pub fn current_fen(&self) -> String {
        Fen::from_position(self.pos.clone(), EnPassantMode::Legal).to_string()
    }

    /// Every move played, oldest first.
    pub fn history(&self) -> &[HistEntry] {
        &self.history
    }

    /// The coordinate text of every move played, for `position` commands.
    pub fn uci_moves(&self) -> Vec<String> {
        self.history.iter().map(|h| h.uci.clone()).collect()
    }

    /// The last move played, in coordinate notation.
    pub fn last_move_uci(&self) -> Option<&str> {
        self.history.last().map(|h| h.uci.as_str())
    }

    /// Records the thinking time for the most recent move.
    pub fn set_last_elapsed(&mut self, elapsed: f64) {
        if let Some(last) = self.history.last_mut() {
            last.elapsed = elapsed;
        }
    }

    /// Whether `coord` is a legal move in the current position.
    pub fn is_legal(&self, coord: &str) -> bool {
        coord
            .parse::<Uci>()
            .ok()
            .and_then(|uci| uci.to_move(&self.pos).ok())
            .is_some()
    }

    /// Validates and plays the move given as coordinate text.
    ///
    /// On success the side to move has toggled and the move is on the
    /// history with its SAN rendering.
    pub fn check_make(&mut self, coord: &str) -> Result<(), BoardError> {
        let illegal = || BoardError::IllegalMove {
            mv: coord.to_string(),
            fen: self.current_fen(),
        };
        let uci: Uci = coord.parse().map_err(|_| illegal())?;
        let mv = uci.to_move(&self.pos).map_err(|_| illegal())?;

        let side = self.pos.turn();
        let san = SanPlus::from_move(self.pos.clone(), &mv).to_string();
        self.pos.play_unchecked(&mv);
        self.keys.push(zobrist(&self.pos));
        self.history.push(HistEntry {
            uci: Uci::from_standard(&mv).to_string(),
            san,
            side,
            elapsed: 0.0,
        });
        Ok(())
    }

    /// Checks the board rules for a terminal state.
    ///
    /// Order matters: mate and stalemate outrank the counting rules, and
    /// the counting rules fire the moment their condition holds.
    pub fn rule(&self) -> Option<Verdict> {
        if self.pos.is_checkmate() {
            return Some(Verdict::new(
                GameOutcome::loss_for(self.pos.turn()),
                EndReason::Checkmate,
            ));
        }
        if self.pos.is_stalemate() {
            return Some(Verdict::new(GameOutcome::Draw, EndReason::Stalemate));
        }
        if self.pos.is_insufficient_material() {
            return Some(Verdict::new(
                GameOutcome::Draw,
                EndReason::InsufficientMaterial,
            ));
        }
        if self.pos.halfmoves() >= 100 {
            return Some(Verdict::new(GameOutcome::Draw, EndReason::FiftyMove));
        }
        let current = *self.keys.last()?;
        if self.keys.iter().filter(|&&k| k == current).count() >= 3 {
            return Some(Verdict::new(GameOutcome::Draw, EndReason::Repetition));
        }
        None
    }
}

fn zobrist(pos: &Chess) -> u64 {
    let key: Zobrist64 = pos.zobrist_hash(EnPassantMode::Legal);
    key.0
}
