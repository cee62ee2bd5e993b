//! Polyglot binary books.
//!
//! The file is a sequence of 16-byte big-endian records sorted by key:
//!
//! ```text
//! u64 key    Zobrist hash of the position
//! u16 move   packed from/to/promotion
//! u16 weight
//! u32 learn
//! ```
//!
//! Integers are composed from bytes explicitly; the records are never
//! reinterpreted as raw structs.

use std::path::Path;

use rand::Rng;
use shakmaty::uci::Uci;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{Chess, EnPassantMode, File, Position, Rank, Role, Square};

use crate::{BookError, Opening};

/// Size of one record on disk.
const RECORD_SIZE: usize = 16;

/// One decoded book record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolyglotEntry {
    /// Zobrist key of the position this entry belongs to.
    pub key: u64,
    /// Packed move field.
    pub mv: u16,
    /// Relative weight among entries sharing a key.
    pub weight: u16,
    /// Learning data, unused here.
    pub learn: u32,
}

impl PolyglotEntry {
    fn from_bytes(raw: &[u8]) -> PolyglotEntry {
        PolyglotEntry {
            key: u64::from_be_bytes(raw[0..8].try_into().unwrap()),
            mv: u16::from_be_bytes(raw[8..10].try_into().unwrap()),
            weight: u16::from_be_bytes(raw[10..12].try_into().unwrap()),
            learn: u32::from_be_bytes(raw[12..16].try_into().unwrap()),
        }
    }

    /// Unpacks the move field into coordinate notation.
    ///
    /// Bits 0-2 to-file, 3-5 to-rank, 6-8 from-file, 9-11 from-rank,
    /// 12-14 promotion (0 none, then N, B, R, Q). Castling is encoded as
    /// king-takes-own-rook (`e1h1`) and translated to the standard
    /// king-two-squares form.
    pub fn uci(&self) -> Uci {
        let to_file = File::new(u32::from(self.mv) & 0x7);
        let to_rank = Rank::new((u32::from(self.mv) >> 3) & 0x7);
        let from_file = File::new((u32::from(self.mv) >> 6) & 0x7);
        let from_rank = Rank::new((u32::from(self.mv) >> 9) & 0x7);
        let promotion = match (self.mv >> 12) & 0x7 {
            1 => Some(Role::Knight),
            2 => Some(Role::Bishop),
            3 => Some(Role::Rook),
            4 => Some(Role::Queen),
            _ => None,
        };

        let from = Square::from_coords(from_file, from_rank);
        let mut to = Square::from_coords(to_file, to_rank);
        match (from, to) {
            (Square::E1, Square::H1) => to = Square::G1,
            (Square::E1, Square::A1) => to = Square::C1,
            (Square::E8, Square::H8) => to = Square::G8,
            (Square::E8, Square::A8) => to = Square::C8,
            _ => {}
        }

        Uci::Normal {
            from,
            to,
            promotion,
        }
    }
}

/// A loaded Polyglot book plus its draw parameters.
#[derive(Debug)]
pub struct PolyglotBook {
    entries: Vec<PolyglotEntry>,
    max_ply: usize,
    /// Percentage of the heaviest entries per position to draw from.
    top100: u16,
}

impl PolyglotBook {
    /// Loads a book from `path`, rejecting truncated or unsorted files.
    pub fn load(path: &Path, max_ply: usize, top100: u16) -> Result<Self, BookError> {
        let bytes = std::fs::read(path).map_err(|source| BookError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if bytes.len() % RECORD_SIZE != 0 {
            return Err(BookError::InvalidPolyglot {
                path: path.display().to_string(),
                detail: format!("length {} is not a multiple of {}", bytes.len(), RECORD_SIZE),
            });
        }

        let entries: Vec<PolyglotEntry> = bytes
            .chunks_exact(RECORD_SIZE)
            .map(PolyglotEntry::from_bytes)
            .collect();

        if entries.windows(2).any(|w| w[0].key > w[1].key) {
            return Err(BookError::InvalidPolyglot {
                path: path.display().to_string(),
                detail: "keys are not sorted ascending".to_string(),
            });
        }

        Ok(PolyglotBook {
            entries,
            max_ply,
            top100,
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the book holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All records for `key`, in file order.
    pub fn search(&self, key: u64) -> &[PolyglotEntry] {
        let start = self.entries.partition_point(|e| e.key < key);
        let end = self.entries.partition_point(|e| e.key <= key);
        &self.entries[start..end]
    }

    /// Walks the book from the standard start, appending one drawn move
    /// per ply until the book runs out or `max_ply` is reached.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Option<Opening> {
        let mut pos = Chess::default();
        let mut moves = Vec::new();

        while moves.len() < self.max_ply {
            let key: Zobrist64 = pos.zobrist_hash(EnPassantMode::Legal);
            let found = self.search(key.0);
            if found.is_empty() {
                break;
            }

            let mut candidates: Vec<&PolyglotEntry> = found.iter().collect();
            candidates.sort_by(|a, b| b.weight.cmp(&a.weight));
            let cutoff = candidates.len() * usize::from(self.top100) / 100;
            let idx = if cutoff == 0 {
                0
            } else {
                rng.gen_range(0..cutoff)
            };

            let Ok(mv) = candidates[idx].uci().to_move(&pos) else {
                break;
            };
            moves.push(Uci::from_standard(&mv).to_string());
            pos.play_unchecked(&mv);
        }

        if moves.is_empty() {
            None
        } else {
            Some(Opening {
                fen: None,
                moves,
            })
        }
    }
}
