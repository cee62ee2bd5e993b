//! Game outcomes and the reasons behind them.

use shakmaty::Color;

/// The outcome of a game, always from white's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    /// White won.
    WhiteWins,
    /// Black won.
    BlackWins,
    /// The game was drawn.
    Draw,
    /// No result: the game was aborted or never finished.
    Unfinished,
}

impl GameOutcome {
    /// A win for `side`.
    pub fn win_for(side: Color) -> GameOutcome {
        match side {
            Color::White => GameOutcome::WhiteWins,
            Color::Black => GameOutcome::BlackWins,
        }
    }

    /// A loss for `side`.
    pub fn loss_for(side: Color) -> GameOutcome {
        GameOutcome::win_for(side.other())
    }

    /// The PGN result token: `1-0`, `0-1`, `1/2-1/2` or `*`.
    pub fn pgn_token(&self) -> &'static str {
        match self {
            GameOutcome::WhiteWins => "1-0",
            GameOutcome::BlackWins => "0-1",
            GameOutcome::Draw => "1/2-1/2",
            GameOutcome::Unfinished => "*",
        }
    }

    /// Tournament points for `side`: 1 for a win, ½ for a draw.
    pub fn points_for(&self, side: Color) -> f64 {
        match (self, side) {
            (GameOutcome::WhiteWins, Color::White) | (GameOutcome::BlackWins, Color::Black) => 1.0,
            (GameOutcome::Draw, _) => 0.5,
            _ => 0.0,
        }
    }
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Mate on the board.
    Checkmate,
    /// Side to move has no legal move and is not in check.
    Stalemate,
    /// Threefold repetition.
    Repetition,
    /// Fifty moves without capture or pawn move.
    FiftyMove,
    /// Neither side can mate.
    InsufficientMaterial,
    /// The controller adjudicated the result from engine scores.
    Adjudication,
    /// Flag fell.
    Timeout,
    /// An engine played an illegal move.
    IllegalMove,
    /// An engine process died or stopped responding.
    Crash,
    /// The engine resigned.
    Resign,
    /// The game was aborted before producing a result.
    Aborted,
}

impl EndReason {
    /// The PGN `Termination` tag value.
    pub fn termination(&self) -> &'static str {
        match self {
            EndReason::Checkmate => "checkmate",
            EndReason::Stalemate => "stalemate",
            EndReason::Repetition => "repetition",
            EndReason::FiftyMove => "fifty moves",
            EndReason::InsufficientMaterial => "insufficient material",
            EndReason::Adjudication => "adjudication",
            EndReason::Timeout => "time forfeit",
            EndReason::IllegalMove => "illegal move",
            EndReason::Crash => "crash",
            EndReason::Resign => "resign",
            EndReason::Aborted => "aborted",
        }
    }
}

/// Outcome plus reason, the full result of one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Who won, from white's perspective.
    pub outcome: GameOutcome,
    /// How the game ended.
    pub reason: EndReason,
}

impl Verdict {
    /// Builds a verdict from the given parts.
    pub fn new(outcome: GameOutcome, reason: EndReason) -> Verdict {
        Verdict { outcome, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_is_from_whites_perspective() {
        assert_eq!(GameOutcome::loss_for(Color::White), GameOutcome::BlackWins);
        assert_eq!(GameOutcome::win_for(Color::Black), GameOutcome::BlackWins);
        assert_eq!(GameOutcome::WhiteWins.pgn_token(), "1-0");
        assert_eq!(GameOutcome::Unfinished.pgn_token(), "*");
    }

    #[test]
    fn points_by_side() {
        assert_eq!(GameOutcome::WhiteWins.points_for(Color::White), 1.0);
        assert_eq!(GameOutcome::WhiteWins.points_for(Color::Black), 0.0);
        assert_eq!(GameOutcome::Draw.points_for(Color::Black), 0.5);
        assert_eq!(GameOutcome::Unfinished.points_for(Color::White), 0.0);
    }

    #[test]
    fn termination_strings_match_pgn_conventions() {
        assert_eq!(EndReason::Timeout.termination(), "time forfeit");
        assert_eq!(EndReason::IllegalMove.termination(), "illegal move");
        assert_eq!(EndReason::Checkmate.termination(), "checkmate");
    }
}
