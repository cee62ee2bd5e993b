//! The tournament: pairing generation, the concurrent game pool,
//! standings and the PGN sink.

use std::collections::{HashSet, VecDeque};

use thiserror::Error;
use tracing::{info, warn};

use tourney_books::{BookError, BookManager};

use crate::config::{ConfigError, TourConfig, TournamentType};
use crate::game::{Game, GameState};
use crate::pgn::{self, PgnGame};
use crate::player::{EnginePlayer, Player, PlayerState};
use crate::ticker::{Ticker, TICK_PERIOD};
use crate::verdict::{EndReason, GameOutcome, Verdict};

/// Ticks a game may sit in its begin state before non-ready players are
/// written off as crashed (10 s at the default period).
const STARTUP_BUDGET_TICKS: u64 = 200;

/// Ticks a freed player may keep owing a bestmove before it is recycled.
const DRAIN_BUDGET_TICKS: u64 = 100;

/// Errors that abort the whole event.
#[derive(Error, Debug)]
pub enum TournamentError {
    /// Configuration was unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An opening book failed to load.
    #[error(transparent)]
    Book(#[from] BookError),
    /// Writing the PGN archive or results failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An ordered game assignment: who plays white, who plays black, when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    /// Engine index of the white player.
    pub white: usize,
    /// Engine index of the black player.
    pub black: usize,
    /// Round number, 1-based.
    pub round: u32,
    /// Sequential game number within the event.
    pub idx: u32,
    /// Shared by the reversed-colour games of one pair.
    pub pair_id: u32,
}

/// The outcome of one finished (or written-off) game.
#[derive(Debug, Clone, Copy)]
pub struct GameRecord {
    /// The pairing that was played.
    pub pairing: Pairing,
    /// How it ended.
    pub verdict: Verdict,
    /// Half-moves played.
    pub moves: usize,
}

/// All round-robin pairings for `participants`, expanded to
/// `games_per_pair` orderings with alternating colours.
pub fn round_robin_pairings(participants: &[usize], games_per_pair: u32) -> Vec<Pairing> {
    let mut pairings = Vec::new();
    let mut pair_id = 0;
    let mut idx = 0;
    for (i, &a) in participants.iter().enumerate() {
        for &b in &participants[i + 1..] {
            for g in 0..games_per_pair {
                let (white, black) = if g % 2 == 0 { (a, b) } else { (b, a) };
                pairings.push(Pairing {
                    white,
                    black,
                    round: idx + 1,
                    idx,
                    pair_id,
                });
                idx += 1;
            }
            pair_id += 1;
        }
    }
    pairings
}

/// Gauntlet pairings: the seed against every other participant.
pub fn gauntlet_pairings(
    seed: usize,
    participants: &[usize],
    games_per_pair: u32,
) -> Vec<Pairing> {
    let mut pairings = Vec::new();
    let mut pair_id = 0;
    let mut idx = 0;
    for &other in participants.iter().filter(|&&p| p != seed) {
        for g in 0..games_per_pair {
            let (white, black) = if g % 2 == 0 {
                (seed, other)
            } else {
                (other, seed)
            };
            pairings.push(Pairing {
                white,
                black,
                round: idx + 1,
                idx,
                pair_id,
            });
            idx += 1;
        }
        pair_id += 1;
    }
    pairings
}

/// One row of the standings table.
#[derive(Debug, Clone, PartialEq)]
pub struct StandingRow {
    /// Engine index.
    pub engine: usize,
    /// Display name.
    pub name: String,
    /// Decisive games won.
    pub wins: u32,
    /// Decisive games lost.
    pub losses: u32,
    /// Drawn games.
    pub draws: u32,
    /// 1 per win, half per draw.
    pub points: f64,
    /// Sonneborn-Berger tiebreak.
    pub sonneborn_berger: f64,
}

/// Recomputes the standings from the result log.
///
/// Sonneborn-Berger: the sum of defeated opponents' scores plus half the
/// sum of drawn opponents' scores. Unfinished games count for nobody.
pub fn compute_standings(
    config: &TourConfig,
    participants: &[usize],
    records: &[GameRecord],
) -> Vec<StandingRow> {
    let n = config.engines.len();
    let mut points = vec![0.0f64; n];
    let mut tally = vec![(0u32, 0u32, 0u32); n]; // wins, losses, draws

    for record in records {
        let Pairing { white, black, .. } = record.pairing;
        match record.verdict.outcome {
            GameOutcome::WhiteWins => {
                points[white] += 1.0;
                tally[white].0 += 1;
                tally[black].1 += 1;
            }
            GameOutcome::BlackWins => {
                points[black] += 1.0;
                tally[black].0 += 1;
                tally[white].1 += 1;
            }
            GameOutcome::Draw => {
                points[white] += 0.5;
                points[black] += 0.5;
                tally[white].2 += 1;
                tally[black].2 += 1;
            }
            GameOutcome::Unfinished => {}
        }
    }

    let mut sb = vec![0.0f64; n];
    for record in records {
        let Pairing { white, black, .. } = record.pairing;
        match record.verdict.outcome {
            GameOutcome::WhiteWins => sb[white] += points[black],
            GameOutcome::BlackWins => sb[black] += points[white],
            GameOutcome::Draw => {
                sb[white] += points[black] / 2.0;
                sb[black] += points[white] / 2.0;
            }
            GameOutcome::Unfinished => {}
        }
    }

    let mut rows: Vec<StandingRow> = participants
        .iter()
        .map(|&e| StandingRow {
            engine: e,
            name: config.engines[e].name.clone(),
            wins: tally[e].0,
            losses: tally[e].1,
            draws: tally[e].2,
            points: points[e],
            sonneborn_berger: sb[e],
        })
        .collect();
    rows.sort_by(|a, b| {
        b.points
            .partial_cmp(&a.points)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.sonneborn_berger
                    .partial_cmp(&a.sonneborn_berger)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    rows
}

/// Renders the standings as a plain-text table.
pub fn render_standings(rows: &[StandingRow]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<4}{:<24}{:>6}{:>5}{:>5}{:>5}{:>8}{:>8}\n",
        "#", "Name", "Games", "W", "L", "D", "Points", "SB"
    ));
    for (i, row) in rows.iter().enumerate() {
        out.push_str(&format!(
            "{:<4}{:<24}{:>6}{:>5}{:>5}{:>5}{:>8.1}{:>8.2}\n",
            i + 1,
            row.name,
            row.wins + row.losses + row.draws,
            row.wins,
            row.losses,
            row.draws,
            row.points,
            row.sonneborn_berger,
        ));
    }
    out
}

/// What the pairing source says when asked for work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairerStep {
    /// Start this game now.
    Start(Pairing),
    /// A later round needs current games to finish first.
    WaitRound,
    /// Nothing left to play.
    Exhausted,
}

/// The pairing source: eager queues for round-robin and gauntlet, lazy
/// round construction for knockout and swiss.
enum Pairer {
    Queue(VecDeque<Pairing>),
    Knockout(KnockoutPairer),
    Swiss(SwissPairer),
}

impl Pairer {
    fn next(&mut self, records: &[GameRecord]) -> PairerStep {
        match self {
            Pairer::Queue(queue) => match queue.pop_front() {
                Some(pairing) => PairerStep::Start(pairing),
                None => PairerStep::Exhausted,
            },
            Pairer::Knockout(pairer) => pairer.next(records),
            Pairer::Swiss(pairer) => pairer.next(records),
        }
    }
}

/// Single-elimination bracket, rounds built from the previous round's
/// winners. Drawn pairs advance the lower engine index.
struct KnockoutPairer {
    entrants: Vec<usize>,
    games_per_pair: u32,
    round: u32,
    pending: VecDeque<Pairing>,
    /// Pairs of the round in flight: `(pair_id, a, b)`.
    current_pairs: Vec<(u32, usize, usize)>,
    next_idx: u32,
    next_pair_id: u32,
}

impl KnockoutPairer {
    fn new(entrants: Vec<usize>, games_per_pair: u32) -> KnockoutPairer {
        let mut pairer = KnockoutPairer {
            entrants,
            games_per_pair,
            round: 0,
            pending: VecDeque::new(),
            current_pairs: Vec::new(),
            next_idx: 0,
            next_pair_id: 0,
        };
        pairer.build_round();
        pairer
    }

    fn build_round(&mut self) {
        self.round += 1;
        self.current_pairs.clear();
        let mut advancing = Vec::new();
        let mut entrants = std::mem::take(&mut self.entrants).into_iter();
        while let Some(a) = entrants.next() {
            match entrants.next() {
                Some(b) => {
                    let pair_id = self.next_pair_id;
                    self.next_pair_id += 1;
                    self.current_pairs.push((pair_id, a, b));
                    for g in 0..self.games_per_pair {
                        let (white, black) = if g % 2 == 0 { (a, b) } else { (b, a) };
                        self.pending.push_back(Pairing {
                            white,
                            black,
                            round: self.round,
                            idx: self.next_idx,
                            pair_id,
                        });
                        self.next_idx += 1;
                    }
                }
                // Odd entrant count: a bye straight into the next round.
                None => advancing.push(a),
            }
        }
        self.entrants = advancing;
    }

    fn next(&mut self, records: &[GameRecord]) -> PairerStep {
        if let Some(pairing) = self.pending.pop_front() {
            return PairerStep::Start(pairing);
        }
        if self.current_pairs.is_empty() {
            return PairerStep::Exhausted;
        }

        let expected = self.current_pairs.len() * self.games_per_pair as usize;
        let round_records: Vec<&GameRecord> = records
            .iter()
            .filter(|r| r.pairing.round == self.round)
            .collect();
        if round_records.len() < expected {
            return PairerStep::WaitRound;
        }

        for &(pair_id, a, b) in &self.current_pairs {
            let mut a_points = 0.0;
            let mut b_points = 0.0;
            for record in round_records.iter().filter(|r| r.pairing.pair_id == pair_id) {
                let Pairing { white, black, .. } = record.pairing;
                a_points += record.verdict.outcome.points_for_engine(a, white, black);
                b_points += record.verdict.outcome.points_for_engine(b, white, black);
            }
            let winner = match a_points.partial_cmp(&b_points) {
                Some(std::cmp::Ordering::Less) => b,
                Some(std::cmp::Ordering::Greater) => a,
                _ => a.min(b),
            };
            self.entrants.push(winner);
        }

        if self.entrants.len() <= 1 {
            self.current_pairs.clear();
            return PairerStep::Exhausted;
        }
        self.build_round();
        match self.pending.pop_front() {
            Some(pairing) => PairerStep::Start(pairing),
            None => PairerStep::Exhausted,
        }
    }
}

/// Swiss pairing: each round pairs neighbours in the standings, greedily
/// avoiding rematches. Rounds: ceil(log2(n)) like a knockout's depth.
struct SwissPairer {
    participants: Vec<usize>,
    games_per_pair: u32,
    max_rounds: u32,
    round: u32,
    pending: VecDeque<Pairing>,
    issued_this_round: usize,
    played: HashSet<(usize, usize)>,
    next_idx: u32,
    next_pair_id: u32,
}

impl SwissPairer {
    fn new(participants: Vec<usize>, games_per_pair: u32) -> SwissPairer {
        let n = participants.len().max(2);
        let max_rounds = (usize::BITS - (n - 1).leading_zeros()).max(1);
        SwissPairer {
            participants,
            games_per_pair,
            max_rounds,
            round: 0,
            pending: VecDeque::new(),
            issued_this_round: 0,
            played: HashSet::new(),
            next_idx: 0,
            next_pair_id: 0,
        }
    }

    fn build_round(&mut self, standings_order: Vec<usize>) {
        self.round += 1;
        self.issued_this_round = 0;
        let mut unpaired = standings_order;
        while unpaired.len() >= 2 {
            let a = unpaired.remove(0);
            let partner = unpaired
                .iter()
                .position(|&b| !self.played.contains(&key(a, b)))
                .unwrap_or(0);
            let b = unpaired.remove(partner);
            self.played.insert(key(a, b));
            let pair_id = self.next_pair_id;
            self.next_pair_id += 1;
            for g in 0..self.games_per_pair {
                let (white, black) = if g % 2 == 0 { (a, b) } else { (b, a) };
                self.pending.push_back(Pairing {
                    white,
                    black,
                    round: self.round,
                    idx: self.next_idx,
                    pair_id,
                });
                self.next_idx += 1;
                self.issued_this_round += 1;
            }
        }
    }

    fn next(&mut self, records: &[GameRecord]) -> PairerStep {
        if let Some(pairing) = self.pending.pop_front() {
            return PairerStep::Start(pairing);
        }
        if self.round > 0 {
            let done = records
                .iter()
                .filter(|r| r.pairing.round == self.round)
                .count();
            if done < self.issued_this_round {
                return PairerStep::WaitRound;
            }
        }
        if self.round >= self.max_rounds {
            return PairerStep::Exhausted;
        }

        // Order by current score, stable on engine index for round one.
        let mut scores: Vec<(usize, f64)> =
            self.participants.iter().map(|&p| (p, 0.0)).collect();
        for record in records {
            let Pairing { white, black, .. } = record.pairing;
            for entry in scores.iter_mut() {
                entry.1 += record
                    .verdict
                    .outcome
                    .points_for_engine(entry.0, white, black);
            }
        }
        scores.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        self.build_round(scores.into_iter().map(|(p, _)| p).collect());
        match self.pending.pop_front() {
            Some(pairing) => PairerStep::Start(pairing),
            None => PairerStep::Exhausted,
        }
    }
}

fn key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

impl GameOutcome {
    /// Points `engine` earned in a game it played as `white` or `black`.
    fn points_for_engine(self, engine: usize, white: usize, black: usize) -> f64 {
        if engine == white {
            self.points_for(shakmaty::Color::White)
        } else if engine == black {
            self.points_for(shakmaty::Color::Black)
        } else {
            0.0
        }
    }
}

/// One pooled player instance.
struct PlayerSlot {
    engine: usize,
    player: Box<dyn Player>,
    attached: bool,
    drain_ticks: u64,
}

/// The running event.
pub struct Tournament {
    config: TourConfig,
    participants: Vec<usize>,
    books: BookManager,
    pairer: Pairer,
    slots: Vec<PlayerSlot>,
    live: Vec<Game>,
    records: Vec<GameRecord>,
    disabled: HashSet<usize>,
    exhausted: bool,
}

impl Tournament {
    /// Builds the event from a validated configuration.
    pub fn new(config: TourConfig) -> Result<Tournament, TournamentError> {
        config.validate()?;
        let participants = config.participants();
        let books = BookManager::load(&config.opening_books.setup()?)?;

        let pairer = match config.tournament_type {
            TournamentType::RoundRobin => Pairer::Queue(
                round_robin_pairings(&participants, config.games_per_pair).into(),
            ),
            TournamentType::Gauntlet => Pairer::Queue(
                gauntlet_pairings(participants[0], &participants, config.games_per_pair)
                    .into(),
            ),
            TournamentType::Knockout => Pairer::Knockout(KnockoutPairer::new(
                participants.clone(),
                config.games_per_pair,
            )),
            TournamentType::Swiss => Pairer::Swiss(SwissPairer::new(
                participants.clone(),
                config.games_per_pair,
            )),
        };

        Ok(Tournament {
            config,
            participants,
            books,
            pairer,
            slots: Vec::new(),
            live: Vec::new(),
            records: Vec::new(),
            disabled: HashSet::new(),
            exhausted: false,
        })
    }

    /// Runs the event to completion and returns the result log.
    pub fn run(&mut self) -> Result<Vec<GameRecord>, TournamentError> {
        info!(
            event = %self.config.event,
            participants = self.participants.len(),
            "tournament starting"
        );
        let mut ticker = Ticker::new(TICK_PERIOD);
        loop {
            ticker.wait();
            self.tick()?;
            if self.exhausted && self.live.is_empty() {
                break;
            }
        }
        self.shutdown();
        info!(games = self.records.len(), "tournament finished");
        Ok(std::mem::take(&mut self.records))
    }

    /// The standings for the games recorded so far.
    pub fn standings(&self) -> Vec<StandingRow> {
        compute_standings(&self.config, &self.participants, &self.records)
    }

    /// One scheduler step: advance games, reap finished ones, start new ones.
    fn tick(&mut self) -> Result<(), TournamentError> {
        for game in &mut self.live {
            let (white, black) =
                slot_pair(&mut self.slots, game.white_slot(), game.black_slot());
            game.tick(white.player.as_mut(), black.player.as_mut());
        }

        let mut still_live = Vec::new();
        let mut finished = Vec::new();
        for game in self.live.drain(..) {
            if game.state() == GameState::Stopped {
                finished.push(game);
            } else {
                still_live.push(game);
            }
        }
        self.live = still_live;
        for game in finished {
            self.finish_game(game)?;
        }

        self.drain_free_slots();
        self.fill_slots();
        Ok(())
    }

    fn finish_game(&mut self, game: Game) -> Result<(), TournamentError> {
        let verdict = game
            .verdict()
            .unwrap_or(Verdict::new(GameOutcome::Unfinished, EndReason::Aborted));
        let white_slot = game.white_slot();
        let black_slot = game.black_slot();
        let pairing = Pairing {
            white: self.slots[white_slot].engine,
            black: self.slots[black_slot].engine,
            round: game.round(),
            idx: game.idx(),
            pair_id: game.pair_id(),
        };

        self.records.push(GameRecord {
            pairing,
            verdict,
            moves: game.board().ply(),
        });

        let pgn_game = PgnGame {
            event: &self.config.event,
            site: &self.config.site,
            round: game.round(),
            white: &self.config.engines[pairing.white].name,
            black: &self.config.engines[pairing.black].name,
            verdict,
            time_control: game.time_controller().describe(),
            start_fen: game.board().start_fen(),
            moves: game.board().history(),
            started_at: game.started_at(),
        };
        pgn::append(&self.config.pgn_file, &pgn_game)?;

        for slot in [white_slot, black_slot] {
            self.slots[slot].player.detach();
            self.slots[slot].attached = false;
        }
        Ok(())
    }

    /// Keeps unattached players responsive: drains their stale events and
    /// recycles any that keep owing a bestmove.
    fn drain_free_slots(&mut self) {
        for slot in self.slots.iter_mut().filter(|s| !s.attached) {
            let _ = slot.player.tick();
            if slot.player.expecting_bestmove() {
                slot.drain_ticks += 1;
                if slot.drain_ticks > DRAIN_BUDGET_TICKS {
                    warn!(
                        player = slot.player.name(),
                        "never produced its bestmove, recycling"
                    );
                    slot.player.quit();
                    slot.drain_ticks = 0;
                }
            } else {
                slot.drain_ticks = 0;
            }
        }
    }

    fn fill_slots(&mut self) {
        while self.live.len() < self.config.concurrency && !self.exhausted {
            match self.pairer.next(&self.records) {
                PairerStep::Exhausted => {
                    self.exhausted = true;
                }
                PairerStep::WaitRound => break,
                PairerStep::Start(pairing) => self.start_pairing(pairing),
            }
        }
    }

    fn start_pairing(&mut self, pairing: Pairing) {
        let disabled_side = if self.disabled.contains(&pairing.white) {
            Some(GameOutcome::BlackWins)
        } else if self.disabled.contains(&pairing.black) {
            Some(GameOutcome::WhiteWins)
        } else {
            None
        };
        if let Some(outcome) = disabled_side {
            warn!(game = pairing.idx, "engine disabled, recording crash loss");
            self.records.push(GameRecord {
                pairing,
                verdict: Verdict::new(outcome, EndReason::Crash),
                moves: 0,
            });
            return;
        }

        let Some(white_slot) = self.acquire_slot(pairing.white) else {
            self.records.push(GameRecord {
                pairing,
                verdict: Verdict::new(GameOutcome::BlackWins, EndReason::Crash),
                moves: 0,
            });
            return;
        };
        let Some(black_slot) = self.acquire_slot(pairing.black) else {
            self.slots[white_slot].attached = false;
            self.records.push(GameRecord {
                pairing,
                verdict: Verdict::new(GameOutcome::WhiteWins, EndReason::Crash),
                moves: 0,
            });
            return;
        };

        let opening = self.books.opening_for(pairing.pair_id);
        let game = Game::new(
            pairing.idx,
            pairing.round,
            pairing.pair_id,
            white_slot,
            black_slot,
            opening,
            self.config.time_control.controller(),
            self.config.adjudication,
            STARTUP_BUDGET_TICKS,
        );
        self.live.push(game);
    }

    /// A usable slot for `engine`: a free healthy instance, a respawned
    /// crashed one, or a brand-new spawn. `None` disables the engine.
    fn acquire_slot(&mut self, engine: usize) -> Option<usize> {
        let reusable = self.slots.iter().position(|s| {
            s.engine == engine
                && !s.attached
                && !s.player.expecting_bestmove()
                && matches!(s.player.state(), PlayerState::Ready | PlayerState::Playing)
        });
        if let Some(i) = reusable {
            self.slots[i].attached = true;
            return Some(i);
        }

        // Crash repair happens here: dead instances are replaced lazily.
        let respawnable = self.slots.iter().position(|s| {
            s.engine == engine
                && !s.attached
                && matches!(
                    s.player.state(),
                    PlayerState::Crashed | PlayerState::Stopped | PlayerState::NotStarted
                )
        });

        let config = self.config.engines[engine].clone();
        let mut player = EnginePlayer::new(config, self.config.ponder);
        if let Err(err) = player.kick_start() {
            warn!(engine = %self.config.engines[engine].name,
                  "spawn failed, disabling engine: {}", err);
            self.disabled.insert(engine);
            return None;
        }

        match respawnable {
            Some(i) => {
                self.slots[i].player.quit();
                self.slots[i] = PlayerSlot {
                    engine,
                    player: Box::new(player),
                    attached: true,
                    drain_ticks: 0,
                };
                Some(i)
            }
            None => {
                self.slots.push(PlayerSlot {
                    engine,
                    player: Box::new(player),
                    attached: true,
                    drain_ticks: 0,
                });
                Some(self.slots.len() - 1)
            }
        }
    }

    /// Quits every player, joining each with the detach timeout.
    fn shutdown(&mut self) {
        for slot in &mut self.slots {
            slot.player.quit();
        }
        self.slots.clear();
    }
}

fn slot_pair(
    slots: &mut [PlayerSlot],
    a: usize,
    b: usize,
) -> (&mut PlayerSlot, &mut PlayerSlot) {
    assert_ne!(a, b, "a game needs two distinct player slots");
    if a < b {
        let (left, right) = slots.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = slots.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::path::PathBuf;

    fn config_with(names: &[&str]) -> TourConfig {
        TourConfig {
            engines: names
                .iter()
                .map(|n| EngineConfig {
                    name: n.to_string(),
                    command: PathBuf::from(format!("/bin/{}", n)),
                    ..EngineConfig::default()
                })
                .collect(),
            ..TourConfig::default()
        }
    }

    fn record(pairing: Pairing, outcome: GameOutcome) -> GameRecord {
        GameRecord {
            pairing,
            verdict: Verdict::new(outcome, EndReason::Checkmate),
            moves: 10,
        }
    }

    #[test]
    fn round_robin_counts_and_colour_reversal() {
        let pairings = round_robin_pairings(&[0, 1, 2, 3], 2);
        // 4 engines -> 6 unordered pairs -> 12 games.
        assert_eq!(pairings.len(), 12);

        let first = pairings[0];
        let second = pairings[1];
        assert_eq!(first.pair_id, second.pair_id);
        assert_eq!(first.white, second.black);
        assert_eq!(first.black, second.white);

        // Sequential idx, distinct pair ids per unordered pair.
        let ids: Vec<u32> = pairings.iter().map(|p| p.idx).collect();
        assert_eq!(ids, (0..12).collect::<Vec<u32>>());
        let pair_ids: HashSet<u32> = pairings.iter().map(|p| p.pair_id).collect();
        assert_eq!(pair_ids.len(), 6);
    }

    #[test]
    fn gauntlet_always_involves_the_seed() {
        let pairings = gauntlet_pairings(2, &[0, 1, 2, 3], 2);
        assert_eq!(pairings.len(), 6);
        for pairing in &pairings {
            assert!(pairing.white == 2 || pairing.black == 2);
            assert_ne!(pairing.white, pairing.black);
        }
    }

    #[test]
    fn standings_points_and_order() {
        let config = config_with(&["a", "b", "c"]);
        let pairings = round_robin_pairings(&[0, 1, 2], 1);
        // a beats b, a draws c, b loses to c.
        let records = vec![
            record(pairings[0], GameOutcome::WhiteWins), // a-b
            record(pairings[1], GameOutcome::Draw),      // a-c
            record(pairings[2], GameOutcome::BlackWins), // b-c -> c wins
        ];
        let rows = compute_standings(&config, &[0, 1, 2], &records);
        assert_eq!(rows[0].name, "a");
        assert_eq!(rows[0].points, 1.5);
        assert_eq!(rows[1].name, "c");
        assert_eq!(rows[1].points, 1.5);
        assert_eq!(rows[2].name, "b");
        assert_eq!(rows[2].points, 0.0);
        // a's SB: beat b (0 points) + half of c's 1.5 = 0.75.
        assert!((rows[0].sonneborn_berger - 0.75).abs() < 1e-9);
        // c's SB: beat b (0) + half of a's 1.5 = 0.75; order then stable.
        assert!((rows[1].sonneborn_berger - 0.75).abs() < 1e-9);
    }

    #[test]
    fn sonneborn_berger_breaks_ties() {
        let config = config_with(&["a", "b", "c", "d"]);
        let pairings = round_robin_pairings(&[0, 1, 2, 3], 1);
        // a beats b and c, loses to d; d loses to b and c.
        // Everyone lands on 1.5-ish scores except constructed spread.
        let records = vec![
            record(pairings[0], GameOutcome::WhiteWins), // a-b
            record(pairings[1], GameOutcome::WhiteWins), // a-c
            record(pairings[2], GameOutcome::BlackWins), // a-d -> d
            record(pairings[3], GameOutcome::BlackWins), // b-c -> c
            record(pairings[4], GameOutcome::WhiteWins), // b-d -> b
            record(pairings[5], GameOutcome::WhiteWins), // c-d -> c
        ];
        let rows = compute_standings(&config, &[0, 1, 2, 3], &records);
        // a and c both have 2 points; c beat b(1) and d(1) -> SB 2,
        // a beat b(1) and c(2) -> SB 3, so a ranks first.
        assert_eq!(rows[0].name, "a");
        assert_eq!(rows[1].name, "c");
        assert!(rows[0].sonneborn_berger > rows[1].sonneborn_berger);
    }

    #[test]
    fn knockout_waits_for_rounds_and_advances_winners() {
        let mut pairer = KnockoutPairer::new(vec![0, 1, 2, 3], 1);
        let first = match pairer.next(&[]) {
            PairerStep::Start(p) => p,
            other => panic!("expected a pairing, got {:?}", other),
        };
        let second = match pairer.next(&[]) {
            PairerStep::Start(p) => p,
            other => panic!("expected a pairing, got {:?}", other),
        };
        assert_eq!(first.round, 1);
        assert_eq!(second.round, 1);

        // Round incomplete: no new pairings yet.
        let records = vec![record(first, GameOutcome::WhiteWins)];
        assert_eq!(pairer.next(&records), PairerStep::WaitRound);

        let records = vec![
            record(first, GameOutcome::WhiteWins),  // 0 beats 1
            record(second, GameOutcome::BlackWins), // 3 beats 2
        ];
        let final_pairing = match pairer.next(&records) {
            PairerStep::Start(p) => p,
            other => panic!("expected the final, got {:?}", other),
        };
        assert_eq!(final_pairing.round, 2);
        assert_eq!(key(final_pairing.white, final_pairing.black), (0, 3));

        let mut records = records;
        records.push(record(final_pairing, GameOutcome::WhiteWins));
        assert_eq!(pairer.next(&records), PairerStep::Exhausted);
    }

    #[test]
    fn knockout_drawn_pair_advances_lower_index() {
        let mut pairer = KnockoutPairer::new(vec![0, 1], 1);
        let pairing = match pairer.next(&[]) {
            PairerStep::Start(p) => p,
            other => panic!("expected a pairing, got {:?}", other),
        };
        let records = vec![record(pairing, GameOutcome::Draw)];
        // Single pair: with the draw resolved the bracket is done.
        assert_eq!(pairer.next(&records), PairerStep::Exhausted);
    }

    #[test]
    fn swiss_avoids_rematches() {
        let mut pairer = SwissPairer::new(vec![0, 1, 2, 3], 1);
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        loop {
            match pairer.next(&records) {
                PairerStep::Start(pairing) => {
                    let k = key(pairing.white, pairing.black);
                    assert!(seen.insert(k), "rematch of {:?}", k);
                    records.push(record(pairing, GameOutcome::WhiteWins));
                }
                PairerStep::WaitRound => continue,
                PairerStep::Exhausted => break,
            }
        }
        // Two rounds of two games each for four players.
        assert_eq!(records.len(), 4);
    }

    #[test]
    fn slot_pair_splits_disjoint_indices() {
        let mut slots: Vec<PlayerSlot> = (0..3)
            .map(|i| PlayerSlot {
                engine: i,
                player: Box::new(crate::player::HumanPlayer::new("x")),
                attached: false,
                drain_ticks: 0,
            })
            .collect();
        let (a, b) = slot_pair(&mut slots, 2, 0);
        assert_eq!(a.engine, 2);
        assert_eq!(b.engine, 0);
    }

    #[test]
    fn disabled_engine_games_become_crash_losses() {
        let mut config = config_with(&["a", "b"]);
        config.games_per_pair = 2;
        let mut tournament = Tournament::new(config).unwrap();
        tournament.disabled.insert(0);

        tournament.fill_slots();
        // Engine 0 is disabled: every scheduled game was written off
        // without spawning anything.
        assert_eq!(tournament.records.len(), 2);
        assert!(tournament.live.is_empty());
        let first = &tournament.records[0];
        assert_eq!(first.verdict.reason, EndReason::Crash);
        assert_eq!(first.verdict.outcome, GameOutcome::BlackWins);
        let second = &tournament.records[1];
        assert_eq!(second.verdict.outcome, GameOutcome::WhiteWins);
    }

    #[test]
    fn render_standings_is_aligned() {
        let config = config_with(&["alpha", "beta"]);
        let pairings = round_robin_pairings(&[0, 1], 1);
        let records = vec![record(pairings[0], GameOutcome::WhiteWins)];
        let rows = compute_standings(&config, &[0, 1], &records);
        let table = render_standings(&rows);
        assert!(table.lines().count() == 3);
        assert!(table.contains("alpha"));
        assert!(table.contains("1.0"));
    }
}
