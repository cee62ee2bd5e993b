//! The virtual chess clock.
//!
//! Four modes: infinite, fixed depth, fixed milliseconds per move, and the
//! standard tournament control with periodic refills and increments. The
//! per-side `remain` counters are only mutated in
//! [`TimeController::setup_clocks_before_thinking`] and
//! [`TimeController::update_clock_after_move`].

use std::time::Instant;

use shakmaty::Color;
use tourney_protocol::GoSpec;

/// Tolerance before a flag fall is declared, absorbing scheduling jitter.
pub const GRACE_SECS: f64 = 0.01;

/// The configured time control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeMode {
    /// No limit at all.
    Infinite,
    /// Search to a fixed depth; no wall clock.
    Depth(u32),
    /// Fixed seconds per move; the clock never refills.
    MoveTime(f64),
    /// `moves` per period (0 = Fischer continuous), `base` seconds per
    /// period, `inc` seconds added after every move.
    Standard {
        /// Moves per control period; 0 means no periodic refill.
        moves: u32,
        /// Seconds granted per period.
        base: f64,
        /// Seconds added after each completed move.
        inc: f64,
    },
}

/// Per-side chess clock driving one game.
#[derive(Debug, Clone)]
pub struct TimeController {
    mode: TimeMode,
    /// Remaining seconds per side, indexed white then black.
    remain: [f64; 2],
    think_start: Option<Instant>,
}

fn idx(side: Color) -> usize {
    match side {
        Color::White => 0,
        Color::Black => 1,
    }
}

impl TimeController {
    /// A fresh clock for one game.
    pub fn new(mode: TimeMode) -> TimeController {
        let base = match mode {
            TimeMode::Standard { base, .. } => base,
            _ => 0.0,
        };
        TimeController {
            mode,
            remain: [base, base],
            think_start: None,
        }
    }

    /// The configured mode.
    pub fn mode(&self) -> TimeMode {
        self.mode
    }

    /// Called when it becomes a side's turn, before `go` is sent.
    ///
    /// Records the wall-clock start of thinking and refills the side's
    /// clock when a new control period begins: with `moves` per period,
    /// the side to move at half-move `ply` has completed `ply / 2` full
    /// moves, and a refill lands exactly when that count reaches a
    /// positive multiple of `moves`.
    pub fn setup_clocks_before_thinking(&mut self, ply: usize, side: Color) {
        self.think_start = Some(Instant::now());
        if let TimeMode::Standard { moves, base, .. } = self.mode {
            let full_moves = ply / 2;
            if moves > 0 && full_moves > 0 && full_moves % moves as usize == 0 {
                self.remain[idx(side)] += base;
            }
        }
    }

    /// Called after a move is accepted: charge the elapsed time and add
    /// the increment.
    pub fn update_clock_after_move(&mut self, elapsed: f64, side: Color) {
        if let TimeMode::Standard { inc, .. } = self.mode {
            let r = &mut self.remain[idx(side)];
            *r -= elapsed;
            *r += inc;
        }
        self.think_start = None;
    }

    /// Remaining seconds for `side`; unlimited modes report infinity.
    pub fn time_left(&self, side: Color) -> f64 {
        match self.mode {
            TimeMode::Standard { .. } => self.remain[idx(side)],
            _ => f64::INFINITY,
        }
    }

    /// Seconds since thinking began, zero when nobody is thinking.
    pub fn elapsed(&self) -> f64 {
        self.think_start
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Whether `side`, currently thinking, has run out of time.
    pub fn is_time_over(&self, side: Color) -> bool {
        self.over_budget(side, self.elapsed())
    }

    fn over_budget(&self, side: Color, elapsed: f64) -> bool {
        match self.mode {
            TimeMode::Infinite | TimeMode::Depth(_) => false,
            TimeMode::MoveTime(secs) => elapsed > secs + GRACE_SECS,
            TimeMode::Standard { .. } => {
                self.remain[idx(side)] - elapsed < -GRACE_SECS
            }
        }
    }

    /// Search limits for the next `go`, given the half-move count.
    pub fn go_spec(&self, ply: usize) -> GoSpec {
        match self.mode {
            TimeMode::Infinite => GoSpec::Infinite,
            TimeMode::Depth(d) => GoSpec::Depth(d),
            TimeMode::MoveTime(secs) => GoSpec::MoveTime(to_ms(secs)),
            TimeMode::Standard { moves, inc, .. } => {
                let movestogo = if moves > 0 {
                    let done = (ply / 2) as u32 % moves;
                    Some(moves - done)
                } else {
                    None
                };
                GoSpec::Clock {
                    wtime_ms: to_ms(self.remain[0]),
                    btime_ms: to_ms(self.remain[1]),
                    winc_ms: to_ms(inc),
                    binc_ms: to_ms(inc),
                    movestogo,
                }
            }
        }
    }

    /// Rendered for the PGN `TimeControl` tag.
    pub fn describe(&self) -> String {
        match self.mode {
            TimeMode::Infinite => "-".to_string(),
            TimeMode::Depth(d) => format!("depth {}", d),
            TimeMode::MoveTime(secs) => format!("{}s/move", secs),
            TimeMode::Standard { moves, base, inc } => {
                if moves > 0 {
                    format!("{}/{}+{}", moves, base as u64, inc as u64)
                } else {
                    format!("{}+{}", base as u64, inc as u64)
                }
            }
        }
    }
}

fn to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}
