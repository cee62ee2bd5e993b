//! EPD text books: one position per line.

use std::path::Path;

use rand::Rng;
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess};

use crate::{BookError, Opening};

/// A book of starting positions, one FEN/EPD record per line.
///
/// Lines starting with `#` and blank lines are ignored at load time;
/// invalid positions are only discovered when drawn, and make that draw
/// fail so the caller can retry.
#[derive(Debug, Default)]
pub struct EpdBook {
    lines: Vec<String>,
}

impl EpdBook {
    /// Loads a book from `path`.
    pub fn load(path: &Path) -> Result<Self, BookError> {
        let text = std::fs::read_to_string(path).map_err(|source| BookError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        Ok(EpdBook { lines })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the book holds no records.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Draws one record uniformly and validates it as a position.
    ///
    /// EPD records may omit the move counters, so the position is
    /// round-tripped through the board library and re-emitted as a full
    /// FEN. Returns `None` if the book is empty or the drawn record does
    /// not parse as a legal position.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Option<Opening> {
        if self.lines.is_empty() {
            return None;
        }
        let line = &self.lines[rng.gen_range(0..self.lines.len())];
        let record = normalize_epd(line);
        let fen: Fen = record.parse().ok()?;
        let pos: Chess = fen.into_position(CastlingMode::Standard).ok()?;
        let full = Fen::from_position(pos, shakmaty::EnPassantMode::Legal).to_string();
        Some(Opening {
            fen: Some(full),
            moves: Vec::new(),
        })
    }
}

/// Cuts EPD opcodes off a record and pads the move counters FEN wants.
fn normalize_epd(line: &str) -> String {
    let mut fields: Vec<&str> = line.split_whitespace().take(6).collect();
    // An EPD opcode section starts at the first field ending in ';' or a
    // known opcode; the first four fields are always the position proper.
    if fields.len() > 4 && fields[4].chars().any(|c| !c.is_ascii_digit()) {
        fields.truncate(4);
    }
    match fields.len() {
        4 => format!("{} 0 1", fields.join(" ")),
        5 => format!("{} 1", fields.join(" ")),
        _ => fields.join(" "),
    }
}
