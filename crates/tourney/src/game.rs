//! The per-match state machine.
//!
//! A game couples two players, a board and a clock. It is driven from the
//! scheduler thread: every tick drains both players' events, advances the
//! lifecycle, and polls the clock of whichever side is thinking. All
//! mutation happens on that one thread, which is what serializes the
//! `go -> bestmove -> make -> go` sequence.

use chrono::{DateTime, Local};
use shakmaty::Color;
use tracing::{debug, info, warn};

use tourney_books::Opening;

use crate::board::Board;
use crate::config::AdjudicationConfig;
use crate::player::{ComputingState, Player, PlayerEvent, PlayerState};
use crate::time_control::TimeController;
use crate::verdict::{EndReason, GameOutcome, Verdict};

/// Lifecycle of one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    /// Waiting for both players to finish their handshakes.
    Begin,
    /// Both ready; play starts on the next tick.
    Ready,
    /// Moves are being exchanged.
    Playing,
    /// Terminal; the verdict is set.
    Stopped,
}

/// Per-side engine score bookkeeping feeding adjudication.
#[derive(Debug, Default)]
struct ScoreTracker {
    /// Latest ledger score reported by each side, white first.
    last: [Option<i32>; 2],
    /// Consecutive plies the resign condition held against each side.
    resign_run: [u32; 2],
    /// Consecutive plies both scores sat inside the draw band.
    draw_run: u32,
}

fn idx(side: Color) -> usize {
    match side {
        Color::White => 0,
        Color::Black => 1,
    }
}

impl ScoreTracker {
    fn record(&mut self, side: Color, score: Option<i32>) {
        if let Some(score) = score {
            self.last[idx(side)] = Some(score);
        }
    }

    /// Updates the run counters once per accepted move.
    fn after_move(&mut self, cfg: &AdjudicationConfig) {
        for side in [Color::White, Color::Black] {
            let own = self.last[idx(side)];
            let opp = self.last[idx(side.other())];
            let holds = cfg.resign_score > 0
                && matches!((own, opp), (Some(o), Some(p))
                    if o <= -cfg.resign_score && p >= cfg.resign_score);
            let run = &mut self.resign_run[idx(side)];
            *run = if holds { *run + 1 } else { 0 };
        }

        let in_band = cfg.draw_score > 0
            && matches!(
                (self.last[0], self.last[1]),
                (Some(w), Some(b))
                    if w.abs() <= cfg.draw_score && b.abs() <= cfg.draw_score
            );
        self.draw_run = if in_band { self.draw_run + 1 } else { 0 };
    }

    fn verdict(&self, cfg: &AdjudicationConfig, ply: usize) -> Option<Verdict> {
        if cfg.resign_ply > 0 {
            for side in [Color::White, Color::Black] {
                if self.resign_run[idx(side)] >= cfg.resign_ply {
                    return Some(Verdict::new(
                        GameOutcome::loss_for(side),
                        EndReason::Adjudication,
                    ));
                }
            }
        }
        if cfg.draw_ply > 0
            && self.draw_run >= cfg.draw_ply
            && ply >= cfg.draw_min_ply as usize
        {
            return Some(Verdict::new(GameOutcome::Draw, EndReason::Adjudication));
        }
        if cfg.max_ply > 0 && ply >= cfg.max_ply as usize {
            return Some(Verdict::new(GameOutcome::Draw, EndReason::Aborted));
        }
        None
    }
}

/// One match between two pool players.
pub struct Game {
    idx: u32,
    round: u32,
    pair_id: u32,
    white_slot: usize,
    black_slot: usize,
    state: GameState,
    board: Board,
    tc: TimeController,
    opening: Opening,
    verdict: Option<Verdict>,
    adjudication: AdjudicationConfig,
    scores: ScoreTracker,
    begin_ticks: u64,
    startup_budget: u64,
    started_at: DateTime<Local>,
}

impl Game {
    /// A new game between the players in `white_slot` and `black_slot`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        idx: u32,
        round: u32,
        pair_id: u32,
        white_slot: usize,
        black_slot: usize,
        opening: Opening,
        tc: TimeController,
        adjudication: AdjudicationConfig,
        startup_budget: u64,
    ) -> Game {
        Game {
            idx,
            round,
            pair_id,
            white_slot,
            black_slot,
            state: GameState::Begin,
            board: Board::new_game(None).expect("standard start is valid"),
            tc,
            opening,
            verdict: None,
            adjudication,
            scores: ScoreTracker::default(),
            begin_ticks: 0,
            startup_budget,
            started_at: Local::now(),
        }
    }

    /// Sequential game number within the event.
    pub fn idx(&self) -> u32 {
        self.idx
    }

    /// Round this game belongs to.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Shared by the reversed-colour sibling.
    pub fn pair_id(&self) -> u32 {
        self.pair_id
    }

    /// Pool slot of the white player.
    pub fn white_slot(&self) -> usize {
        self.white_slot
    }

    /// Pool slot of the black player.
    pub fn black_slot(&self) -> usize {
        self.black_slot
    }

    /// Lifecycle state.
    pub fn state(&self) -> GameState {
        self.state
    }

    /// The verdict, once the game stopped.
    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    /// The board with its history.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The clock.
    pub fn time_controller(&self) -> &TimeController {
        &self.tc
    }

    /// Wall-clock start of the game.
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Advances the game by one tick.
    pub fn tick(&mut self, white: &mut dyn Player, black: &mut dyn Player) {
        if self.state == GameState::Stopped {
            return;
        }

        let white_events = white.tick();
        let black_events = black.tick();
        for event in white_events {
            self.handle_event(Color::White, event, white, black);
        }
        for event in black_events {
            self.handle_event(Color::Black, event, white, black);
        }

        match self.state {
            GameState::Begin => self.tick_begin(white, black),
            GameState::Ready => self.start_playing(white, black),
            GameState::Playing => {
                let side = self.board.side();
                let mover = if side == Color::White { &*white } else { &*black };
                if mover.computing_state() == ComputingState::Thinking {
                    self.check_time_over(white, black);
                }
            }
            GameState::Stopped => {}
        }
    }

    fn tick_begin(&mut self, white: &mut dyn Player, black: &mut dyn Player) {
        self.begin_ticks += 1;
        let over_budget = self.begin_ticks > self.startup_budget;

        let up = |p: &dyn Player| p.state() == PlayerState::Ready;
        let down = |p: &dyn Player| {
            matches!(p.state(), PlayerState::Crashed | PlayerState::Stopped)
        };

        if up(white) && up(black) {
            self.state = GameState::Ready;
            return;
        }

        let white_out = down(white) || (over_budget && !up(white));
        let black_out = down(black) || (over_budget && !up(black));
        if !white_out && !black_out {
            return;
        }

        let outcome = match (white_out, black_out) {
            (true, true) => GameOutcome::Draw,
            (true, false) => GameOutcome::BlackWins,
            (false, true) => GameOutcome::WhiteWins,
            (false, false) => unreachable!(),
        };
        warn!(game = self.idx, "player failed to start, recording crash");
        self.game_over(Verdict::new(outcome, EndReason::Crash), white, black);
    }

    fn start_playing(&mut self, white: &mut dyn Player, black: &mut dyn Player) {
        let board = match Board::new_game(self.opening.fen.as_deref()) {
            Ok(board) => board,
            Err(err) => {
                warn!(game = self.idx, "bad opening position: {}", err);
                self.game_over(
                    Verdict::new(GameOutcome::Unfinished, EndReason::Aborted),
                    white,
                    black,
                );
                return;
            }
        };
        self.board = board;
        let prefix = self.opening.moves.clone();
        for mv in &prefix {
            if let Err(err) = self.board.check_make(mv) {
                warn!(game = self.idx, "bad opening move: {}", err);
                self.game_over(
                    Verdict::new(GameOutcome::Unfinished, EndReason::Aborted),
                    white,
                    black,
                );
                return;
            }
        }

        white.new_game(&self.board, &self.tc);
        black.new_game(&self.board, &self.tc);
        self.state = GameState::Playing;
        info!(
            game = self.idx,
            white = white.name(),
            black = black.name(),
            "game started"
        );
        self.start_thinking(None, white, black);
    }

    fn handle_event(
        &mut self,
        side: Color,
        event: PlayerEvent,
        white: &mut dyn Player,
        black: &mut dyn Player,
    ) {
        match event {
            PlayerEvent::BecameReady => {}
            PlayerEvent::Info(info) => {
                if self.state == GameState::Playing {
                    self.scores.record(side, info.ledger_score());
                }
            }
            PlayerEvent::Bestmove {
                mv,
                ponder,
                old_state,
            } => {
                self.move_from_player(side, &mv, ponder.as_deref(), old_state, white, black);
            }
            PlayerEvent::Resigned => {
                if self.state == GameState::Playing {
                    self.game_over(
                        Verdict::new(GameOutcome::loss_for(side), EndReason::Resign),
                        white,
                        black,
                    );
                }
            }
            PlayerEvent::Crashed => {
                // A crash of the side not to move is noticed when its turn
                // comes; the opponent's pending move is still welcome.
                if self.state == GameState::Playing && side == self.board.side() {
                    self.game_over(
                        Verdict::new(GameOutcome::loss_for(side), EndReason::Crash),
                        white,
                        black,
                    );
                }
            }
        }
    }

    /// Dispatches one bestmove.
    ///
    /// Late, wrong-side or post-flag events are dropped, never reordered.
    fn move_from_player(
        &mut self,
        side: Color,
        mv_text: &str,
        ponder_text: Option<&str>,
        old_state: ComputingState,
        white: &mut dyn Player,
        black: &mut dyn Player,
    ) {
        if self.state != GameState::Playing
            || self.board.side() != side
            || self.check_time_over(white, black)
        {
            debug!(game = self.idx, "dropping stale bestmove {}", mv_text);
            return;
        }

        match old_state {
            ComputingState::Thinking => {
                let elapsed = self.tc.elapsed();
                if self.board.check_make(mv_text).is_err() {
                    info!(game = self.idx, "illegal move {} from {}", mv_text, side);
                    self.game_over(
                        Verdict::new(GameOutcome::loss_for(side), EndReason::IllegalMove),
                        white,
                        black,
                    );
                    return;
                }
                self.board.set_last_elapsed(elapsed);
                self.tc.update_clock_after_move(elapsed, side);
                self.scores.after_move(&self.adjudication);

                if let Some(verdict) = self.board.rule() {
                    self.game_over(verdict, white, black);
                    return;
                }
                if let Some(verdict) = self.scores.verdict(&self.adjudication, self.board.ply())
                {
                    info!(game = self.idx, "adjudicated: {:?}", verdict);
                    self.game_over(verdict, white, black);
                    return;
                }
                self.start_thinking(ponder_text.map(str::to_string), white, black);
            }
            ComputingState::Pondering => {
                // The discarded reply after a ponder miss: the real search
                // starts now.
                let mover = self.side_player(self.board.side(), white, black);
                mover.go(&self.board, &self.tc);
            }
            ComputingState::Idle => {}
        }
    }

    fn start_thinking(
        &mut self,
        pondermove: Option<String>,
        white: &mut dyn Player,
        black: &mut dyn Player,
    ) {
        let side = self.board.side();

        let mover_state = self.side_player(side, white, black).state();
        if matches!(mover_state, PlayerState::Crashed | PlayerState::Stopped) {
            self.game_over(
                Verdict::new(GameOutcome::loss_for(side), EndReason::Crash),
                white,
                black,
            );
            return;
        }

        self.tc.setup_clocks_before_thinking(self.board.ply(), side);

        if let Some(pm) = pondermove.filter(|pm| self.board.is_legal(pm)) {
            let other = self.side_player(side.other(), white, black);
            other.go_ponder(&self.board, &self.tc, &pm);
        }
        let mover = self.side_player(side, white, black);
        mover.go(&self.board, &self.tc);
    }

    fn side_player<'a>(
        &self,
        side: Color,
        white: &'a mut dyn Player,
        black: &'a mut dyn Player,
    ) -> &'a mut dyn Player {
        if side == Color::White {
            white
        } else {
            black
        }
    }

    fn check_time_over(&mut self, white: &mut dyn Player, black: &mut dyn Player) -> bool {
        if self.state != GameState::Playing {
            return false;
        }
        let side = self.board.side();
        if self.tc.is_time_over(side) {
            info!(game = self.idx, "{:?} lost on time", side);
            self.game_over(
                Verdict::new(GameOutcome::loss_for(side), EndReason::Timeout),
                white,
                black,
            );
            return true;
        }
        false
    }

    fn game_over(&mut self, verdict: Verdict, white: &mut dyn Player, black: &mut dyn Player) {
        white.stop();
        black.stop();
        self.verdict = Some(verdict);
        self.state = GameState::Stopped;
        info!(
            game = self.idx,
            result = verdict.outcome.pgn_token(),
            reason = verdict.reason.termination(),
            "game over"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_control::TimeMode;

    /// A scripted player: hands out canned events, records calls.
    struct ScriptedPlayer {
        name: String,
        state: PlayerState,
        computing: ComputingState,
        queue: Vec<PlayerEvent>,
        go_calls: usize,
        ponder_calls: usize,
        stop_calls: usize,
    }

    impl ScriptedPlayer {
        fn ready(name: &str) -> ScriptedPlayer {
            ScriptedPlayer {
                name: name.to_string(),
                state: PlayerState::Ready,
                computing: ComputingState::Idle,
                queue: Vec::new(),
                go_calls: 0,
                ponder_calls: 0,
                stop_calls: 0,
            }
        }

        fn push_bestmove(&mut self, mv: &str) {
            self.computing = ComputingState::Idle;
            self.queue.push(PlayerEvent::Bestmove {
                mv: mv.to_string(),
                ponder: None,
                old_state: ComputingState::Thinking,
            });
        }
    }

    impl Player for ScriptedPlayer {
        fn name(&self) -> &str {
            &self.name
        }
        fn state(&self) -> PlayerState {
            self.state
        }
        fn computing_state(&self) -> ComputingState {
            self.computing
        }
        fn expecting_bestmove(&self) -> bool {
            self.computing != ComputingState::Idle
        }
        fn kick_start(&mut self) -> Result<(), crate::process::ProcessError> {
            self.state = PlayerState::Ready;
            Ok(())
        }
        fn tick(&mut self) -> Vec<PlayerEvent> {
            std::mem::take(&mut self.queue)
        }
        fn new_game(&mut self, _board: &Board, _tc: &TimeController) {
            self.state = PlayerState::Playing;
        }
        fn go(&mut self, _board: &Board, _tc: &TimeController) {
            self.go_calls += 1;
            self.computing = ComputingState::Thinking;
        }
        fn go_ponder(
            &mut self,
            _board: &Board,
            _tc: &TimeController,
            _pondermove: &str,
        ) -> bool {
            self.ponder_calls += 1;
            self.computing = ComputingState::Pondering;
            true
        }
        fn stop(&mut self) {
            self.stop_calls += 1;
        }
        fn detach(&mut self) {
            if self.state == PlayerState::Playing {
                self.state = PlayerState::Ready;
            }
        }
        fn quit(&mut self) {
            self.state = PlayerState::Stopped;
        }
    }

    fn test_game(opening: Opening) -> Game {
        Game::new(
            0,
            1,
            0,
            0,
            1,
            opening,
            TimeController::new(TimeMode::MoveTime(10.0)),
            AdjudicationConfig::default(),
            200,
        )
    }

    fn mate_opening() -> Opening {
        Opening {
            fen: Some("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1".to_string()),
            moves: Vec::new(),
        }
    }

    #[test]
    fn both_ready_starts_play_and_asks_white_to_move() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        let mut game = test_game(Opening::default());

        game.tick(&mut white, &mut black); // Begin -> Ready
        assert_eq!(game.state(), GameState::Ready);
        game.tick(&mut white, &mut black); // Ready -> Playing, white to move
        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(white.go_calls, 1);
        assert_eq!(black.go_calls, 0);
    }

    #[test]
    fn mating_move_ends_the_game() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        let mut game = test_game(mate_opening());
        game.tick(&mut white, &mut black);
        game.tick(&mut white, &mut black);

        white.push_bestmove("a1a8");
        game.tick(&mut white, &mut black);

        assert_eq!(game.state(), GameState::Stopped);
        let verdict = game.verdict().unwrap();
        assert_eq!(verdict.outcome, GameOutcome::WhiteWins);
        assert_eq!(verdict.reason, EndReason::Checkmate);
        // Both players were told to stop searching.
        assert!(white.stop_calls >= 1);
        assert!(black.stop_calls >= 1);
    }

    #[test]
    fn illegal_move_loses_immediately() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        let mut game = test_game(Opening::default());
        game.tick(&mut white, &mut black);
        game.tick(&mut white, &mut black);

        white.push_bestmove("e2e5");
        game.tick(&mut white, &mut black);

        let verdict = game.verdict().unwrap();
        assert_eq!(verdict.outcome, GameOutcome::BlackWins);
        assert_eq!(verdict.reason, EndReason::IllegalMove);
    }

    #[test]
    fn wrong_side_bestmove_is_dropped() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        let mut game = test_game(Opening::default());
        game.tick(&mut white, &mut black);
        game.tick(&mut white, &mut black);

        // Black volunteers a move although white is to move.
        black.push_bestmove("e7e5");
        game.tick(&mut white, &mut black);

        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.board().ply(), 0);
    }

    #[test]
    fn opening_prefix_is_replayed_before_play() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        let mut game = test_game(Opening {
            fen: None,
            moves: vec!["e2e4".to_string(), "e7e5".to_string()],
        });
        game.tick(&mut white, &mut black);
        game.tick(&mut white, &mut black);

        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(game.board().ply(), 2);
        // White to move again after the even prefix.
        assert_eq!(white.go_calls, 1);
    }

    #[test]
    fn illegal_opening_prefix_aborts_without_result() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        let mut game = test_game(Opening {
            fen: None,
            moves: vec!["e2e5".to_string()],
        });
        game.tick(&mut white, &mut black);
        game.tick(&mut white, &mut black);

        let verdict = game.verdict().unwrap();
        assert_eq!(verdict.outcome, GameOutcome::Unfinished);
        assert_eq!(verdict.reason, EndReason::Aborted);
    }

    #[test]
    fn crash_before_ready_is_a_crash_loss() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        black.state = PlayerState::Crashed;
        let mut game = test_game(Opening::default());
        game.tick(&mut white, &mut black);

        let verdict = game.verdict().unwrap();
        assert_eq!(verdict.outcome, GameOutcome::WhiteWins);
        assert_eq!(verdict.reason, EndReason::Crash);
    }

    #[test]
    fn crash_of_side_to_move_ends_the_game() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        let mut game = test_game(Opening::default());
        game.tick(&mut white, &mut black);
        game.tick(&mut white, &mut black);

        white.state = PlayerState::Crashed;
        white.queue.push(PlayerEvent::Crashed);
        game.tick(&mut white, &mut black);

        let verdict = game.verdict().unwrap();
        assert_eq!(verdict.outcome, GameOutcome::BlackWins);
        assert_eq!(verdict.reason, EndReason::Crash);
    }

    #[test]
    fn crash_of_pondering_side_waits_for_the_mover() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        let mut game = test_game(Opening::default());
        game.tick(&mut white, &mut black);
        game.tick(&mut white, &mut black);

        // Black (not to move) dies while white thinks: play continues.
        black.state = PlayerState::Crashed;
        black.queue.push(PlayerEvent::Crashed);
        game.tick(&mut white, &mut black);
        assert_eq!(game.state(), GameState::Playing);

        // White moves; black's turn comes and the crash is noticed.
        white.push_bestmove("e2e4");
        game.tick(&mut white, &mut black);
        let verdict = game.verdict().unwrap();
        assert_eq!(verdict.outcome, GameOutcome::WhiteWins);
        assert_eq!(verdict.reason, EndReason::Crash);
    }

    #[test]
    fn ponder_miss_bestmove_triggers_fresh_go() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        let mut game = test_game(Opening::default());
        game.tick(&mut white, &mut black);
        game.tick(&mut white, &mut black);
        assert_eq!(white.go_calls, 1);

        // The discarded reply from white's cancelled ponder search.
        white.queue.push(PlayerEvent::Bestmove {
            mv: "d2d4".to_string(),
            ponder: None,
            old_state: ComputingState::Pondering,
        });
        game.tick(&mut white, &mut black);

        assert_eq!(game.state(), GameState::Playing);
        assert_eq!(white.go_calls, 2);
        assert_eq!(game.board().ply(), 0);
    }

    #[test]
    fn resignation_loses_for_the_resigner() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        let mut game = test_game(Opening::default());
        game.tick(&mut white, &mut black);
        game.tick(&mut white, &mut black);

        black.queue.push(PlayerEvent::Resigned);
        game.tick(&mut white, &mut black);

        let verdict = game.verdict().unwrap();
        assert_eq!(verdict.outcome, GameOutcome::WhiteWins);
        assert_eq!(verdict.reason, EndReason::Resign);
    }

    #[test]
    fn startup_budget_expires_into_crash() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        black.state = PlayerState::Starting;
        let mut game = Game::new(
            0,
            1,
            0,
            0,
            1,
            Opening::default(),
            TimeController::new(TimeMode::MoveTime(10.0)),
            AdjudicationConfig::default(),
            3,
        );
        for _ in 0..5 {
            game.tick(&mut white, &mut black);
        }
        let verdict = game.verdict().unwrap();
        assert_eq!(verdict.outcome, GameOutcome::WhiteWins);
        assert_eq!(verdict.reason, EndReason::Crash);
    }

    #[test]
    fn adjudication_draws_a_dead_equal_game() {
        let mut white = ScriptedPlayer::ready("w");
        let mut black = ScriptedPlayer::ready("b");
        let mut game = Game::new(
            0,
            1,
            0,
            0,
            1,
            Opening::default(),
            TimeController::new(TimeMode::MoveTime(10.0)),
            AdjudicationConfig {
                draw_score: 10,
                draw_ply: 2,
                draw_min_ply: 2,
                ..AdjudicationConfig::default()
            },
            200,
        );
        game.tick(&mut white, &mut black);
        game.tick(&mut white, &mut black);

        let line = ["g1f3", "g8f6", "f3g1", "f6g8"];
        for (i, mv) in line.iter().enumerate() {
            let mover: &mut ScriptedPlayer = if i % 2 == 0 { &mut white } else { &mut black };
            mover.queue.push(PlayerEvent::Info(tourney_protocol::SearchInfo {
                score_cp: Some(3),
                ..Default::default()
            }));
            mover.push_bestmove(mv);
            game.tick(&mut white, &mut black);
            if game.state() == GameState::Stopped {
                break;
            }
        }

        let verdict = game.verdict().unwrap();
        assert_eq!(verdict.outcome, GameOutcome::Draw);
        assert_eq!(verdict.reason, EndReason::Adjudication);
    }

    #[test]
    fn resign_adjudication_needs_both_scores_to_agree() {
        let cfg = AdjudicationConfig {
            resign_score: 500,
            resign_ply: 2,
            ..AdjudicationConfig::default()
        };
        let mut scores = ScoreTracker::default();
        scores.record(Color::White, Some(-600));
        scores.record(Color::Black, Some(550));
        scores.after_move(&cfg);
        assert!(scores.verdict(&cfg, 30).is_none());
        scores.after_move(&cfg);
        let verdict = scores.verdict(&cfg, 31).unwrap();
        assert_eq!(verdict.outcome, GameOutcome::BlackWins);
        assert_eq!(verdict.reason, EndReason::Adjudication);
    }

    #[test]
    fn resign_adjudication_breaks_on_disagreement() {
        let cfg = AdjudicationConfig {
            resign_score: 500,
            resign_ply: 2,
            ..AdjudicationConfig::default()
        };
        let mut scores = ScoreTracker::default();
        scores.record(Color::White, Some(-600));
        scores.record(Color::Black, Some(100));
        scores.after_move(&cfg);
        scores.after_move(&cfg);
        assert!(scores.verdict(&cfg, 40).is_none());
    }
}
