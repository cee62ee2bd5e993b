//! Players: the engine-facing state machine above one process.
//!
//! A player is the capability set the game needs: `new_game`, `go`,
//! `go_ponder`, `stop`, `quit`, plus the polled event stream. Both wire
//! protocols share one [`EnginePlayer`] that composes an
//! [`EngineProcess`] with protocol-specific encoding; a [`HumanPlayer`]
//! stub satisfies the same surface and never computes.

use std::time::Duration;

use tracing::{debug, warn};

use tourney_protocol::uci::{self, IdField, UciMessage};
use tourney_protocol::xboard::{self, FeatureSet, XbMessage};
use tourney_protocol::{EngineOption, Protocol, SearchInfo};

use crate::board::Board;
use crate::config::{EngineConfig, ProtocolChoice};
use crate::process::{EngineProcess, ProcessError, ProcessEvent};
use crate::time_control::{TimeController, TimeMode};

/// How long `quit` waits before the process is killed.
const DETACH_TIMEOUT: Duration = Duration::from_secs(2);

/// Ticks an xboard engine may spend declaring features before it is
/// assumed to be a protocol-1 engine and marked ready anyway.
const XB_FEATURE_TICKS: u64 = 40;

/// Lifecycle of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No process yet.
    NotStarted,
    /// Process launched, handshake in progress.
    Starting,
    /// Handshake complete, waiting for a game.
    Ready,
    /// Attached to a running game.
    Playing,
    /// Cleanly quit.
    Stopped,
    /// Process died or stopped answering.
    Crashed,
}

/// What a player is computing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputingState {
    /// Nothing in flight.
    Idle,
    /// Searching its own move.
    Thinking,
    /// Speculating on the opponent's time.
    Pondering,
}

/// Events a player surfaces to its game.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The handshake finished.
    BecameReady,
    /// A computation ended.
    Bestmove {
        /// Best move in coordinate notation.
        mv: String,
        /// Predicted reply, if offered.
        ponder: Option<String>,
        /// What the engine was doing when the move arrived.
        old_state: ComputingState,
    },
    /// Telemetry while thinking.
    Info(SearchInfo),
    /// The engine resigned (xboard only).
    Resigned,
    /// The process died unexpectedly.
    Crashed,
}

/// The capability set a game drives.
pub trait Player {
    /// Display name.
    fn name(&self) -> &str;
    /// Lifecycle state.
    fn state(&self) -> PlayerState;
    /// Computation state.
    fn computing_state(&self) -> ComputingState;
    /// Whether a bestmove is owed.
    fn expecting_bestmove(&self) -> bool;
    /// Whether this player is the human stub.
    fn is_human(&self) -> bool {
        false
    }
    /// Launches the process and begins the handshake.
    fn kick_start(&mut self) -> Result<(), ProcessError>;
    /// Advances the state machine; returns events in arrival order.
    fn tick(&mut self) -> Vec<PlayerEvent>;
    /// Resets per-game state and announces the new game.
    fn new_game(&mut self, board: &Board, tc: &TimeController);
    /// Starts thinking on the current position.
    fn go(&mut self, board: &Board, tc: &TimeController);
    /// Starts speculating on `pondermove`; returns whether anything was sent.
    fn go_ponder(&mut self, board: &Board, tc: &TimeController, pondermove: &str) -> bool;
    /// Asks for the pending bestmove early. Idempotent.
    fn stop(&mut self);
    /// Releases the player from its finished game, back to `Ready`.
    fn detach(&mut self);
    /// Quits the protocol and reaps the process.
    fn quit(&mut self);
}

/// An external engine speaking UCI or xboard.
pub struct EnginePlayer {
    config: EngineConfig,
    /// Pondering needs both the engine's consent and the event's.
    ponder_allowed: bool,
    process: Option<EngineProcess>,
    state: PlayerState,
    computing: ComputingState,
    expecting_bestmove: bool,
    pondering_move: Option<String>,
    stop_sent: bool,
    options: Vec<EngineOption>,
    id_name: Option<String>,
    pending: Vec<PlayerEvent>,
    starting_ticks: u64,
    // xboard bookkeeping
    features: FeatureSet,
    sent_ply: usize,
    ping_count: u64,
}

impl EnginePlayer {
    /// A player for `config`. `ponder` is the event-wide switch.
    pub fn new(config: EngineConfig, ponder: bool) -> EnginePlayer {
        let ponder_allowed = ponder && config.ponderable;
        EnginePlayer {
            config,
            ponder_allowed,
            process: None,
            state: PlayerState::NotStarted,
            computing: ComputingState::Idle,
            expecting_bestmove: false,
            pondering_move: None,
            stop_sent: false,
            options: Vec::new(),
            id_name: None,
            pending: Vec::new(),
            starting_ticks: 0,
            features: FeatureSet::default(),
            sent_ply: 0,
            ping_count: 0,
        }
    }

    /// The engine's self-reported name, once known.
    pub fn id_name(&self) -> Option<&str> {
        self.id_name.as_deref()
    }

    /// Options the engine declared during the handshake.
    pub fn options(&self) -> &[EngineOption] {
        &self.options
    }

    fn write(&mut self, line: &str) -> bool {
        let Some(process) = self.process.as_mut() else {
            return false;
        };
        match process.write_line(line) {
            Ok(()) => true,
            Err(err) => {
                warn!(player = %self.config.name, "write failed: {}", err);
                self.mark_crashed();
                false
            }
        }
    }

    fn mark_crashed(&mut self) {
        if self.state != PlayerState::Crashed && self.state != PlayerState::Stopped {
            self.state = PlayerState::Crashed;
            self.computing = ComputingState::Idle;
            self.expecting_bestmove = false;
            self.pending.push(PlayerEvent::Crashed);
        }
    }

    fn become_ready(&mut self) {
        if self.state == PlayerState::Starting {
            self.state = PlayerState::Ready;
            self.pending.push(PlayerEvent::BecameReady);
        }
    }

    fn finish_computation(&mut self) -> ComputingState {
        let old_state = self.computing;
        self.computing = ComputingState::Idle;
        self.expecting_bestmove = false;
        self.stop_sent = false;
        old_state
    }

    fn handle_uci_line(&mut self, line: &str) {
        match uci::parse(line) {
            Ok(UciMessage::Id { field, value }) => {
                if field == IdField::Name {
                    self.id_name = Some(value);
                }
            }
            Ok(UciMessage::Option(mut option)) => {
                if let Some(value) = self.config.options.get(&option.name) {
                    option.value = Some(json_value_text(value));
                }
                self.options.push(option);
            }
            Ok(UciMessage::UciOk) => {
                let overridden: Vec<String> = self
                    .options
                    .iter()
                    .filter(|o| o.is_overridden())
                    .map(uci::set_option)
                    .collect();
                for cmd in overridden {
                    if !self.write(&cmd) {
                        return;
                    }
                }
                self.write("isready");
                self.become_ready();
            }
            Ok(UciMessage::ReadyOk) => {}
            Ok(UciMessage::Info(info)) => {
                if self.computing == ComputingState::Thinking {
                    self.pending.push(PlayerEvent::Info(info));
                }
            }
            Ok(UciMessage::BestMove { mv, ponder }) => {
                if !self.expecting_bestmove {
                    debug!(player = %self.config.name, "unsolicited bestmove {} dropped", mv);
                    return;
                }
                let old_state = self.finish_computation();
                self.pending.push(PlayerEvent::Bestmove {
                    mv,
                    ponder,
                    old_state,
                });
            }
            Ok(UciMessage::Status(status)) => {
                debug!(player = %self.config.name, "{}", status);
            }
            Ok(UciMessage::Unknown(_)) => {}
            Err(err) => self.protocol_error(err),
        }
    }

    fn handle_xb_line(&mut self, line: &str) {
        match xboard::parse(line) {
            Ok(XbMessage::Features(features)) => {
                let mut replies = Vec::new();
                for feature in &features {
                    let verb = if self.features.apply(feature) {
                        "accepted"
                    } else {
                        "rejected"
                    };
                    replies.push(format!("{} {}", verb, feature.name));
                }
                for reply in replies {
                    if !self.write(&reply) {
                        return;
                    }
                }
                if let Some(name) = self.features.myname.clone() {
                    self.id_name = Some(name);
                }
                if self.features.done {
                    self.become_ready();
                }
            }
            Ok(XbMessage::Move(mv)) => {
                if !self.expecting_bestmove {
                    debug!(player = %self.config.name, "unsolicited move {} dropped", mv);
                    return;
                }
                let old_state = self.finish_computation();
                self.pending.push(PlayerEvent::Bestmove {
                    mv,
                    ponder: None,
                    old_state,
                });
            }
            Ok(XbMessage::Pong(_)) => {}
            Ok(XbMessage::Resign) => self.pending.push(PlayerEvent::Resigned),
            Ok(XbMessage::OfferDraw) => {
                debug!(player = %self.config.name, "draw offer ignored");
            }
            Ok(XbMessage::Complaint(text)) => {
                warn!(player = %self.config.name, "engine complains: {}", text);
            }
            Ok(XbMessage::Unknown(_)) => {}
            Err(err) => self.protocol_error(err),
        }
    }

    /// A structurally broken line is not survivable: the engine is killed
    /// and reported as crashed.
    fn protocol_error(&mut self, err: tourney_protocol::ProtocolError) {
        warn!(player = %self.config.name, "protocol error, killing engine: {}", err);
        self.process.take();
        self.mark_crashed();
    }

    fn sync_xb_moves(&mut self, board: &Board) -> bool {
        let unsent: Vec<String> = board.history()[self.sent_ply..]
            .iter()
            .map(|h| xboard::usermove(&self.features, &h.uci))
            .collect();
        for cmd in unsent {
            if !self.write(&cmd) {
                return false;
            }
        }
        self.sent_ply = board.ply();
        true
    }
}

fn json_value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Player for EnginePlayer {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn state(&self) -> PlayerState {
        self.state
    }

    fn computing_state(&self) -> ComputingState {
        self.computing
    }

    fn expecting_bestmove(&self) -> bool {
        self.expecting_bestmove
    }

    fn kick_start(&mut self) -> Result<(), ProcessError> {
        let process = EngineProcess::spawn(
            &self.config.name,
            &self.config.command,
            &self.config.args,
            self.config.working_folder.as_deref(),
        )?;
        self.process = Some(process);
        self.state = PlayerState::Starting;
        self.starting_ticks = 0;
        let protocol = self.config.protocol.protocol();
        self.write(protocol.greeting());
        if protocol == Protocol::Xboard {
            self.write("protover 2");
        }
        Ok(())
    }

    fn tick(&mut self) -> Vec<PlayerEvent> {
        loop {
            let Some(event) = self.process.as_mut().and_then(EngineProcess::try_event) else {
                break;
            };
            match event {
                ProcessEvent::Line(line) => match self.config.protocol {
                    ProtocolChoice::Uci => self.handle_uci_line(&line),
                    ProtocolChoice::Wb => self.handle_xb_line(&line),
                },
                ProcessEvent::Terminated => self.mark_crashed(),
            }
        }

        // Protocol-1 xboard engines never declare features.
        if self.state == PlayerState::Starting {
            self.starting_ticks += 1;
            if self.config.protocol == ProtocolChoice::Wb
                && self.starting_ticks > XB_FEATURE_TICKS
            {
                self.become_ready();
            }
        }

        std::mem::take(&mut self.pending)
    }

    fn new_game(&mut self, board: &Board, tc: &TimeController) {
        debug_assert!(matches!(
            self.state,
            PlayerState::Ready | PlayerState::Playing
        ));
        self.expecting_bestmove = false;
        self.computing = ComputingState::Idle;
        self.pondering_move = None;
        self.stop_sent = false;
        self.sent_ply = 0;

        match self.config.protocol {
            ProtocolChoice::Uci => {
                if self.write("ucinewgame") {
                    self.state = PlayerState::Playing;
                }
            }
            ProtocolChoice::Wb => {
                if !(self.write("new") && self.write("force") && self.write("post")) {
                    return;
                }
                self.write(if self.ponder_allowed { "hard" } else { "easy" });
                match tc.mode() {
                    TimeMode::Standard { moves, base, inc } => {
                        self.write(&xboard::level(moves, base as u64, inc as u64));
                    }
                    _ => {
                        for cmd in xboard::level_commands(&tc.go_spec(0)) {
                            self.write(&cmd);
                        }
                    }
                }
                if let Some(fen) = board.start_fen() {
                    if !self.features.setboard {
                        warn!(player = %self.config.name,
                              "engine lacks setboard, sending anyway");
                    }
                    self.write(&format!("setboard {}", fen));
                }
                if self.sync_xb_moves(board) {
                    self.state = PlayerState::Playing;
                }
            }
        }
    }

    fn go(&mut self, board: &Board, tc: &TimeController) {
        if self.computing == ComputingState::Pondering {
            // Either the prediction held and the search carries on, or a
            // stop flushes the speculative search; its discarded bestmove
            // arrives with the pondering state and triggers a fresh go.
            if board.last_move_uci() == self.pondering_move.as_deref() {
                self.computing = ComputingState::Thinking;
                self.write("ponderhit");
            } else {
                self.stop();
            }
            return;
        }

        debug_assert!(!self.expecting_bestmove && self.computing == ComputingState::Idle);
        self.expecting_bestmove = true;
        self.computing = ComputingState::Thinking;
        self.stop_sent = false;
        self.pondering_move = None;

        match self.config.protocol {
            ProtocolChoice::Uci => {
                let position = uci::position(board.start_fen(), &board.uci_moves(), None);
                let go = uci::go(&tc.go_spec(board.ply()), false);
                if self.write(&position) {
                    self.write(&go);
                }
            }
            ProtocolChoice::Wb => {
                if !self.write("force") || !self.sync_xb_moves(board) {
                    return;
                }
                let side = board.side();
                let own = tc.time_left(side);
                let opp = tc.time_left(side.other());
                if own.is_finite() {
                    for cmd in xboard::clock_update(to_ms(own), to_ms(opp)) {
                        self.write(&cmd);
                    }
                }
                if self.features.ping {
                    self.ping_count += 1;
                    let ping = format!("ping {}", self.ping_count);
                    self.write(&ping);
                }
                self.write("go");
            }
        }
    }

    fn go_ponder(&mut self, board: &Board, tc: &TimeController, pondermove: &str) -> bool {
        if !self.ponder_allowed || self.config.protocol == ProtocolChoice::Wb {
            // xboard engines manage pondering themselves via `hard`.
            return false;
        }
        if self.computing != ComputingState::Idle || self.expecting_bestmove {
            return false;
        }

        self.pondering_move = Some(pondermove.to_string());
        self.expecting_bestmove = true;
        self.computing = ComputingState::Pondering;
        self.stop_sent = false;

        let position = uci::position(board.start_fen(), &board.uci_moves(), Some(pondermove));
        let go = uci::go(&tc.go_spec(board.ply() + 1), true);
        self.write(&position) && self.write(&go)
    }

    fn stop(&mut self) {
        if self.expecting_bestmove && !self.stop_sent {
            self.stop_sent = true;
            match self.config.protocol {
                ProtocolChoice::Uci => self.write("stop"),
                ProtocolChoice::Wb => self.write("?"),
            };
        }
    }

    fn detach(&mut self) {
        if self.state == PlayerState::Playing {
            self.state = PlayerState::Ready;
        }
    }

    fn quit(&mut self) {
        if self.state == PlayerState::Stopped {
            return;
        }
        if self.state != PlayerState::Crashed {
            self.write("quit");
            self.state = PlayerState::Stopped;
        }
        if let Some(mut process) = self.process.take() {
            process.stop(DETACH_TIMEOUT);
        }
    }
}

/// A human seat: always ready, never computes.
///
/// Exists so a game can be wired up with one engine and one person at the
/// console; move entry is outside this controller's scope.
pub struct HumanPlayer {
    name: String,
    state: PlayerState,
    pending: Vec<PlayerEvent>,
}

impl HumanPlayer {
    /// A human seat named `name`.
    pub fn new(name: &str) -> HumanPlayer {
        HumanPlayer {
            name: name.to_string(),
            state: PlayerState::NotStarted,
            pending: Vec::new(),
        }
    }
}

impl Player for HumanPlayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> PlayerState {
        self.state
    }

    fn computing_state(&self) -> ComputingState {
        ComputingState::Idle
    }

    fn expecting_bestmove(&self) -> bool {
        false
    }

    fn is_human(&self) -> bool {
        true
    }

    fn kick_start(&mut self) -> Result<(), ProcessError> {
        self.state = PlayerState::Ready;
        self.pending.push(PlayerEvent::BecameReady);
        Ok(())
    }

    fn tick(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.pending)
    }

    fn new_game(&mut self, _board: &Board, _tc: &TimeController) {
        self.state = PlayerState::Playing;
    }

    fn go(&mut self, _board: &Board, _tc: &TimeController) {}

    fn go_ponder(&mut self, _board: &Board, _tc: &TimeController, _pondermove: &str) -> bool {
        false
    }

    fn stop(&mut self) {}

    fn detach(&mut self) {
        if self.state == PlayerState::Playing {
            self.state = PlayerState::Ready;
        }
    }

    fn quit(&mut self) {
        self.state = PlayerState::Stopped;
    }
}

fn to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_control::TimeMode;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn stub_config(name: &str, script: &str, ponderable: bool) -> EngineConfig {
        EngineConfig {
            name: name.to_string(),
            command: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
            ponderable,
            ..EngineConfig::default()
        }
    }

    const UCI_STUB: &str = r#"
while read line; do
  case "$line" in
    uci)
      echo "id name Stub 1.0"
      echo "option name Hash type spin default 16 min 1 max 64"
      echo "uciok";;
    isready) echo "readyok";;
    go*)
      echo "info depth 1 score cp 10 pv e2e4"
      echo "bestmove e2e4";;
    quit) exit 0;;
  esac
done
"#;

    /// Ticks until `until` matches an event or the timeout passes,
    /// returning everything seen.
    fn drive(
        player: &mut EnginePlayer,
        timeout: Duration,
        until: impl Fn(&PlayerEvent) -> bool,
    ) -> Vec<PlayerEvent> {
        let deadline = Instant::now() + timeout;
        let mut events = Vec::new();
        while Instant::now() < deadline {
            events.extend(player.tick());
            if events.iter().any(&until) {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        events
    }

    fn is_ready(event: &PlayerEvent) -> bool {
        matches!(event, PlayerEvent::BecameReady)
    }

    fn is_bestmove(event: &PlayerEvent) -> bool {
        matches!(event, PlayerEvent::Bestmove { .. })
    }

    fn is_crash(event: &PlayerEvent) -> bool {
        matches!(event, PlayerEvent::Crashed)
    }

    #[cfg(unix)]
    #[test]
    fn uci_handshake_reaches_ready() {
        let mut player = EnginePlayer::new(stub_config("stub", UCI_STUB, false), false);
        player.kick_start().unwrap();
        let events = drive(&mut player, Duration::from_secs(5), is_ready);
        assert!(events.contains(&PlayerEvent::BecameReady));
        assert_eq!(player.state(), PlayerState::Ready);
        assert_eq!(player.id_name(), Some("Stub 1.0"));
        assert_eq!(player.options().len(), 1);
        player.quit();
    }

    #[cfg(unix)]
    #[test]
    fn go_produces_a_bestmove_event() {
        let mut player = EnginePlayer::new(stub_config("stub", UCI_STUB, false), false);
        player.kick_start().unwrap();
        drive(&mut player, Duration::from_secs(5), is_ready);

        let board = Board::new_game(None).unwrap();
        let tc = TimeController::new(TimeMode::MoveTime(0.1));
        player.new_game(&board, &tc);
        assert_eq!(player.state(), PlayerState::Playing);

        player.go(&board, &tc);
        assert!(player.expecting_bestmove());
        assert_eq!(player.computing_state(), ComputingState::Thinking);

        let events = drive(&mut player, Duration::from_secs(5), is_bestmove);
        let bestmove = events.iter().find_map(|e| match e {
            PlayerEvent::Bestmove { mv, old_state, .. } => Some((mv.clone(), *old_state)),
            _ => None,
        });
        assert_eq!(
            bestmove,
            Some(("e2e4".to_string(), ComputingState::Thinking))
        );
        assert!(!player.expecting_bestmove());
        assert_eq!(player.computing_state(), ComputingState::Idle);
        player.quit();
    }

    #[cfg(unix)]
    #[test]
    fn crash_is_reported_once() {
        let config = stub_config("dies", "exit 7", false);
        let mut player = EnginePlayer::new(config, false);
        player.kick_start().unwrap();
        let events = drive(&mut player, Duration::from_secs(5), is_crash);
        assert!(events.contains(&PlayerEvent::Crashed));
        assert_eq!(player.state(), PlayerState::Crashed);
        assert!(!player.tick().contains(&PlayerEvent::Crashed));
        player.quit();
    }

    #[test]
    fn go_ponder_disabled_never_writes() {
        let mut player = EnginePlayer::new(stub_config("stub", UCI_STUB, false), false);
        let board = Board::new_game(None).unwrap();
        let tc = TimeController::new(TimeMode::MoveTime(0.1));
        assert!(!player.go_ponder(&board, &tc, "e2e4"));
        assert_eq!(player.computing_state(), ComputingState::Idle);
        assert!(!player.expecting_bestmove());
    }

    #[test]
    fn human_stub_is_always_idle() {
        let mut human = HumanPlayer::new("carol");
        human.kick_start().unwrap();
        assert!(human.tick().contains(&PlayerEvent::BecameReady));
        assert_eq!(human.state(), PlayerState::Ready);
        let board = Board::new_game(None).unwrap();
        let tc = TimeController::new(TimeMode::MoveTime(0.1));
        human.new_game(&board, &tc);
        human.go(&board, &tc);
        assert_eq!(human.computing_state(), ComputingState::Idle);
        assert!(!human.expecting_bestmove());
        human.quit();
        assert_eq!(human.state(), PlayerState::Stopped);
    }

    #[cfg(unix)]
    #[test]
    fn stop_twice_sends_once() {
        let mut player = EnginePlayer::new(stub_config("stub", UCI_STUB, false), false);
        player.kick_start().unwrap();
        drive(&mut player, Duration::from_secs(5), is_ready);
        let board = Board::new_game(None).unwrap();
        let tc = TimeController::new(TimeMode::Infinite);
        player.new_game(&board, &tc);
        player.go(&board, &tc);
        player.stop();
        assert!(player.stop_sent);
        player.stop();
        assert!(player.stop_sent);
        player.quit();
    }
}
