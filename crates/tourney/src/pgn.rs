//! PGN emission for finished games.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::board::HistEntry;
use crate::verdict::{GameOutcome, Verdict};

/// Everything one PGN game needs from the controller.
pub struct PgnGame<'a> {
    /// Event tag.
    pub event: &'a str,
    /// Site tag.
    pub site: &'a str,
    /// Round tag; 0 suppresses it.
    pub round: u32,
    /// White player name.
    pub white: &'a str,
    /// Black player name.
    pub black: &'a str,
    /// Result and termination.
    pub verdict: Verdict,
    /// Rendered TimeControl tag.
    pub time_control: String,
    /// FEN tag when not starting from the standard position.
    pub start_fen: Option<&'a str>,
    /// The move list with SAN text.
    pub moves: &'a [HistEntry],
    /// Wall-clock start, for the Date and Time tags.
    pub started_at: DateTime<Local>,
}

/// Renders one game as PGN text, trailing newline included.
pub fn render(game: &PgnGame) -> String {
    let mut out = String::new();
    let result = game.verdict.outcome.pgn_token();

    out.push_str(&format!("[Event \"{}\"]\n", game.event));
    out.push_str(&format!("[Site \"{}\"]\n", game.site));
    out.push_str(&format!(
        "[Date \"{}\"]\n",
        game.started_at.format("%Y.%m.%d")
    ));
    if game.round > 0 {
        out.push_str(&format!("[Round \"{}\"]\n", game.round));
    }
    out.push_str(&format!("[White \"{}\"]\n", game.white));
    out.push_str(&format!("[Black \"{}\"]\n", game.black));
    out.push_str(&format!("[Result \"{}\"]\n", result));
    out.push_str(&format!("[TimeControl \"{}\"]\n", game.time_control));
    out.push_str(&format!(
        "[Time \"{}\"]\n",
        game.started_at.format("%H:%M:%S")
    ));
    out.push_str(&format!(
        "[Termination \"{}\"]\n",
        game.verdict.reason.termination()
    ));
    if let Some(fen) = game.start_fen {
        out.push_str(&format!("[FEN \"{}\"]\n", fen));
    }
    out.push('\n');

    let mut on_line = 0;
    for (i, entry) in game.moves.iter().enumerate() {
        if on_line > 0 {
            out.push(' ');
        }
        if i % 2 == 0 {
            out.push_str(&format!("{}. ", i / 2 + 1));
        }
        out.push_str(&entry.san);
        on_line += 1;
        if on_line >= 8 {
            on_line = 0;
            out.push('\n');
        }
    }
    if game.verdict.outcome != GameOutcome::Unfinished || !game.moves.is_empty() {
        if on_line > 0 {
            out.push(' ');
        }
        out.push_str(result);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Appends one game to the archive at `path`, creating it if needed.
pub fn append<P: AsRef<Path>>(path: P, game: &PgnGame) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(render(game).as_bytes())
}
