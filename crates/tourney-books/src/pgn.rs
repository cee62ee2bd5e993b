//! PGN text books: each game's move list is one opening line.

use std::path::Path;

use rand::Rng;
use shakmaty::san::SanPlus;
use shakmaty::uci::Uci;
use shakmaty::{Chess, Position};

use crate::{BookError, Opening};

/// A book of opening lines read from a PGN file.
///
/// `[Event ...]` headers delimit games; each game contributes the
/// coordinate-notation prefix of its move list, truncated to `max_ply`
/// plies. Games whose move text fails to parse are dropped at load time.
#[derive(Debug, Default)]
pub struct PgnBook {
    lines: Vec<Vec<String>>,
}

impl PgnBook {
    /// Loads a book from `path`, keeping at most `max_ply` plies per line.
    pub fn load(path: &Path, max_ply: usize) -> Result<Self, BookError> {
        let text = std::fs::read_to_string(path).map_err(|source| BookError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut lines = Vec::new();
        let mut move_text = String::new();
        for raw in text.lines() {
            let line = raw.trim();
            if line.starts_with('[') {
                if line.starts_with("[Event") {
                    push_line(&mut lines, &move_text, max_ply);
                    move_text.clear();
                }
                continue;
            }
            move_text.push(' ');
            move_text.push_str(line);
        }
        push_line(&mut lines, &move_text, max_ply);

        Ok(PgnBook { lines })
    }

    /// Number of opening lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the book holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Draws one line uniformly.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Option<Opening> {
        if self.lines.is_empty() {
            return None;
        }
        let moves = self.lines[rng.gen_range(0..self.lines.len())].clone();
        Some(Opening { fen: None, moves })
    }
}

fn push_line(lines: &mut Vec<Vec<String>>, move_text: &str, max_ply: usize) {
    if let Some(mut moves) = san_line_to_moves(move_text) {
        if !moves.is_empty() {
            moves.truncate(max_ply);
            lines.push(moves);
        }
    }
}

/// Parses a SAN move-text line into coordinate moves from the start
/// position.
///
/// Move numbers, results, comments, NAGs and variations are skipped.
/// Returns `None` as soon as a SAN token fails to parse or is illegal,
/// which drops the whole line rather than keeping a corrupt prefix.
pub fn san_line_to_moves(text: &str) -> Option<Vec<String>> {
    let mut pos = Chess::default();
    let mut moves = Vec::new();
    let mut in_comment = false;
    let mut variation_depth = 0usize;

    for token in text.split_whitespace() {
        if in_comment {
            if token.ends_with('}') {
                in_comment = false;
            }
            continue;
        }
        if token.starts_with('{') {
            in_comment = !token.ends_with('}');
            continue;
        }
        if token.starts_with('(') {
            variation_depth += token.bytes().filter(|&b| b == b'(').count();
            continue;
        }
        if variation_depth > 0 {
            variation_depth += token.bytes().filter(|&b| b == b'(').count();
            variation_depth = variation_depth
                .saturating_sub(token.bytes().filter(|&b| b == b')').count());
            continue;
        }
        if token.starts_with('$')
            || token == "1-0"
            || token == "0-1"
            || token == "1/2-1/2"
            || token == "*"
        {
            continue;
        }
        // "12." / "12..." prefixes may be glued to the move token.
        let san_text = token.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.');
        if san_text.is_empty() {
            continue;
        }

        let san: SanPlus = san_text.parse().ok()?;
        let mv = san.san.to_move(&pos).ok()?;
        moves.push(Uci::from_standard(&mv).to_string());
        pos.play_unchecked(&mv);
    }

    Some(moves)
}
