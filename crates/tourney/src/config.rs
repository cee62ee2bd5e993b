//! JSON configuration loading for an event.
//!
//! The file is one object with camelCase keys; everything except the
//! engine list has a sensible default so a minimal config stays minimal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tourney_books::{BookKind, BookSelect, BookSpec, BooksSetup};

use crate::time_control::{TimeMode, TimeController};

/// Errors from loading or validating a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path of the config file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The file parsed but describes an unusable event.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tournament formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TournamentType {
    /// Every pair of participants meets.
    #[default]
    RoundRobin,
    /// One seed engine against everyone else.
    Gauntlet,
    /// Single-elimination bracket.
    Knockout,
    /// Standings-based pairing per round.
    Swiss,
}

/// Which wire protocol an engine speaks, as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolChoice {
    /// UCI.
    #[default]
    Uci,
    /// xboard / winboard.
    Wb,
}

impl ProtocolChoice {
    /// The wire protocol behind the configured tag.
    pub fn protocol(self) -> tourney_protocol::Protocol {
        match self {
            ProtocolChoice::Uci => tourney_protocol::Protocol::Uci,
            ProtocolChoice::Wb => tourney_protocol::Protocol::Xboard,
        }
    }
}

/// One engine entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Display name, also used to select participants.
    pub name: String,
    /// Executable to launch.
    pub command: PathBuf,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Working directory for the child.
    pub working_folder: Option<PathBuf>,
    /// Wire protocol.
    pub protocol: ProtocolChoice,
    /// Whether the engine may think on the opponent's time.
    pub ponderable: bool,
    /// Option overrides sent after the handshake, name to value.
    pub options: BTreeMap<String, serde_json::Value>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            name: String::new(),
            command: PathBuf::new(),
            args: Vec::new(),
            working_folder: None,
            protocol: ProtocolChoice::Uci,
            ponderable: false,
            options: BTreeMap::new(),
        }
    }
}

/// The `timeControl` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeControlConfig {
    /// One of `infinite`, `depth`, `movetime`, `standard`.
    pub mode: TimeControlMode,
    /// Standard mode: moves per period, 0 for Fischer continuous.
    pub moves: u32,
    /// Standard mode: seconds per period. Movetime mode: seconds per move.
    pub base: f64,
    /// Standard mode: seconds added per move.
    pub increment: f64,
    /// Depth mode: plies to search.
    pub depth: u32,
}

/// Names for [`TimeControlConfig::mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeControlMode {
    /// No limit.
    Infinite,
    /// Fixed depth.
    Depth,
    /// Fixed time per move.
    Movetime,
    /// Tournament clock.
    #[default]
    Standard,
}

impl Default for TimeControlConfig {
    fn default() -> Self {
        TimeControlConfig {
            mode: TimeControlMode::Standard,
            moves: 0,
            base: 60.0,
            increment: 0.6,
            depth: 0,
        }
    }
}

impl TimeControlConfig {
    /// A fresh clock for one game.
    pub fn controller(&self) -> TimeController {
        let mode = match self.mode {
            TimeControlMode::Infinite => TimeMode::Infinite,
            TimeControlMode::Depth => TimeMode::Depth(self.depth),
            TimeControlMode::Movetime => TimeMode::MoveTime(self.base),
            TimeControlMode::Standard => TimeMode::Standard {
                moves: self.moves,
                base: self.base,
                inc: self.increment,
            },
        };
        TimeController::new(mode)
    }
}

/// The `openingBooks` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BooksConfig {
    /// Selection policy and `allone` fixtures.
    pub base: BooksBaseConfig,
    /// Book files.
    pub books: Vec<BookFileConfig>,
}

/// The `openingBooks.base` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BooksBaseConfig {
    /// One of `allnew`, `allone`, `samepair`.
    pub select_type: String,
    /// `allone`: fixed starting FEN.
    pub all_one_fen: String,
    /// `allone`: fixed SAN move list.
    pub all_one_san_moves: String,
    /// RNG seed; negative draws from entropy.
    pub seed: i64,
}

impl Default for BooksBaseConfig {
    fn default() -> Self {
        BooksBaseConfig {
            select_type: "allnew".to_string(),
            all_one_fen: String::new(),
            all_one_san_moves: String::new(),
            seed: -1,
        }
    }
}

/// One entry of `openingBooks.books`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookFileConfig {
    /// One of `epd`, `pgn`, `polyglot`.
    #[serde(rename = "type")]
    pub kind: String,
    /// File to load.
    pub path: PathBuf,
    /// Whether the book participates in draws.
    pub mode: bool,
    /// Longest opening prefix in plies.
    pub max_ply: usize,
    /// Polyglot: percentage of heaviest entries to draw from.
    pub top100: u16,
}

impl Default for BookFileConfig {
    fn default() -> Self {
        BookFileConfig {
            kind: "epd".to_string(),
            path: PathBuf::new(),
            mode: true,
            max_ply: 20,
            top100: 100,
        }
    }
}

impl BooksConfig {
    /// Lowers the JSON shape into the book manager's setup.
    pub fn setup(&self) -> Result<BooksSetup, ConfigError> {
        let select = match self.base.select_type.as_str() {
            "allnew" => BookSelect::AllNew,
            "allone" => BookSelect::AllOne,
            "samepair" => BookSelect::SamePair,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown book select type '{}'",
                    other
                )))
            }
        };
        let mut books = Vec::new();
        for file in self.books.iter().filter(|b| b.mode) {
            let kind = match file.kind.as_str() {
                "epd" => BookKind::Epd,
                "pgn" => BookKind::Pgn,
                "polyglot" => BookKind::Polyglot,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "unknown book type '{}'",
                        other
                    )))
                }
            };
            books.push(BookSpec {
                kind,
                path: file.path.clone(),
                max_ply: file.max_ply,
                top100: file.top100.min(100),
            });
        }
        Ok(BooksSetup {
            select,
            all_one_fen: Some(self.base.all_one_fen.clone()).filter(|f| !f.is_empty()),
            all_one_san_moves: Some(self.base.all_one_san_moves.clone())
                .filter(|m| !m.is_empty()),
            seed: u64::try_from(self.base.seed).ok(),
            books,
        })
    }
}

/// The `adjudication` object. A rule with a zero ply threshold is off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdjudicationConfig {
    /// Resign when both scores are at least this far against one side.
    pub resign_score: i32,
    /// Consecutive plies the resign condition must hold; 0 disables.
    pub resign_ply: u32,
    /// Draw when both scores stay within this band.
    pub draw_score: i32,
    /// Consecutive plies the draw condition must hold; 0 disables.
    pub draw_ply: u32,
    /// Earliest ply at which the draw rule may fire.
    pub draw_min_ply: u32,
    /// Abort as drawn after this many plies; 0 disables.
    pub max_ply: u32,
}

impl Default for AdjudicationConfig {
    fn default() -> Self {
        AdjudicationConfig {
            resign_score: 0,
            resign_ply: 0,
            draw_score: 0,
            draw_ply: 0,
            draw_min_ply: 40,
            max_ply: 0,
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TourConfig {
    /// Event name for PGN tags.
    pub event: String,
    /// Site name for PGN tags.
    pub site: String,
    /// Games running at once.
    pub concurrency: usize,
    /// Whether engines may ponder.
    pub ponder: bool,
    /// Standings table destination; empty means stdout only.
    pub result_file: Option<PathBuf>,
    /// PGN archive destination.
    pub pgn_file: PathBuf,
    /// Log destination; empty means stderr.
    pub log_file: Option<PathBuf>,
    /// Tournament format.
    pub tournament_type: TournamentType,
    /// Games per pairing, colours alternating.
    pub games_per_pair: u32,
    /// The clock.
    pub time_control: TimeControlConfig,
    /// All known engines.
    pub engines: Vec<EngineConfig>,
    /// Names of the engines actually playing; empty means all.
    pub players: Vec<String>,
    /// Opening books.
    pub opening_books: BooksConfig,
    /// Score adjudication.
    pub adjudication: AdjudicationConfig,
}

impl Default for TourConfig {
    fn default() -> Self {
        TourConfig {
            event: "Tourney event".to_string(),
            site: "local".to_string(),
            concurrency: 1,
            ponder: false,
            result_file: None,
            pgn_file: PathBuf::from("games.pgn"),
            log_file: None,
            tournament_type: TournamentType::RoundRobin,
            games_per_pair: 2,
            time_control: TimeControlConfig::default(),
            engines: Vec::new(),
            players: Vec::new(),
            opening_books: BooksConfig::default(),
            adjudication: AdjudicationConfig::default(),
        }
    }
}

impl TourConfig {
    /// Reads and validates a configuration file.
    pub fn load(path: &Path) -> Result<TourConfig, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: TourConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the parts that must hold before any process is spawned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engines.is_empty() {
            return Err(ConfigError::Invalid("no engines configured".to_string()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be >= 1".to_string()));
        }
        if self.games_per_pair == 0 {
            return Err(ConfigError::Invalid(
                "gamesPerPair must be >= 1".to_string(),
            ));
        }
        for name in &self.players {
            if !self.engines.iter().any(|e| &e.name == name) {
                return Err(ConfigError::Invalid(format!(
                    "player '{}' is not a configured engine",
                    name
                )));
            }
        }
        let participants = self.participants();
        if participants.len() < 2 {
            return Err(ConfigError::Invalid(
                "at least two participants are required".to_string(),
            ));
        }
        self.opening_books.setup().map(|_| ())
    }

    /// Indices into `engines` of the participating players.
    pub fn participants(&self) -> Vec<usize> {
        if self.players.is_empty() {
            return (0..self.engines.len()).collect();
        }
        self.engines
            .iter()
            .enumerate()
            .filter(|(_, e)| self.players.contains(&e.name))
            .map(|(i, _)| i)
            .collect()
    }

    /// A starter configuration for the `sample` subcommand.
    pub fn sample() -> TourConfig {
        TourConfig {
            event: "My event".to_string(),
            concurrency: 2,
            time_control: TimeControlConfig {
                mode: TimeControlMode::Standard,
                moves: 40,
                base: 300.0,
                increment: 2.0,
                depth: 0,
            },
            engines: vec![
                EngineConfig {
                    name: "stockfish".to_string(),
                    command: PathBuf::from("/usr/bin/stockfish"),
                    protocol: ProtocolChoice::Uci,
                    ponderable: true,
                    ..EngineConfig::default()
                },
                EngineConfig {
                    name: "crafty".to_string(),
                    command: PathBuf::from("/usr/bin/crafty"),
                    protocol: ProtocolChoice::Wb,
                    ..EngineConfig::default()
                },
            ],
            ..TourConfig::default()
        }
    }
}
