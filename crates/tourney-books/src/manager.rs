//! Book selection across a tournament.

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::epd::EpdBook;
use crate::pgn::{san_line_to_moves, PgnBook};
use crate::polyglot::PolyglotBook;
use crate::{BookError, Opening};

/// How openings are assigned across the games of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSelect {
    /// A fresh draw for every game.
    AllNew,
    /// The same configured position or move list for every game.
    AllOne,
    /// One draw shared by both games of a reversed-colour pair.
    SamePair,
}

/// One book file to load.
#[derive(Debug, Clone)]
pub struct BookSpec {
    /// Reader format.
    pub kind: BookKind,
    /// File to read.
    pub path: PathBuf,
    /// Longest move prefix a draw may produce.
    pub max_ply: usize,
    /// Polyglot only: percentage of heaviest entries drawn from.
    pub top100: u16,
}

/// Which reader a book file needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookKind {
    /// One FEN per line.
    Epd,
    /// One opening line per PGN game.
    Pgn,
    /// Binary Polyglot.
    Polyglot,
}

/// Everything the manager needs from configuration.
#[derive(Debug, Clone)]
pub struct BooksSetup {
    /// Selection policy.
    pub select: BookSelect,
    /// `AllOne`: the fixed starting position.
    pub all_one_fen: Option<String>,
    /// `AllOne`: the fixed SAN move list.
    pub all_one_san_moves: Option<String>,
    /// RNG seed; `None` draws one from entropy.
    pub seed: Option<u64>,
    /// Books to load.
    pub books: Vec<BookSpec>,
}

enum LoadedBook {
    Epd(EpdBook),
    Pgn(PgnBook),
    Polyglot(PolyglotBook),
}

impl LoadedBook {
    fn is_empty(&self) -> bool {
        match self {
            LoadedBook::Epd(b) => b.is_empty(),
            LoadedBook::Pgn(b) => b.is_empty(),
            LoadedBook::Polyglot(b) => b.is_empty(),
        }
    }

    fn len(&self) -> usize {
        match self {
            LoadedBook::Epd(b) => b.len(),
            LoadedBook::Pgn(b) => b.len(),
            LoadedBook::Polyglot(b) => b.len(),
        }
    }

    fn draw(&self, rng: &mut StdRng) -> Option<Opening> {
        match self {
            LoadedBook::Epd(b) => b.draw(rng),
            LoadedBook::Pgn(b) => b.draw(rng),
            LoadedBook::Polyglot(b) => b.draw(rng),
        }
    }
}

/// Owns the loaded books and decides which game gets which opening.
pub struct BookManager {
    select: BookSelect,
    all_one: Opening,
    books: Vec<LoadedBook>,
    rng: StdRng,
    last_pair: Option<u32>,
    cached: Opening,
}

impl BookManager {
    /// Loads every configured book. Empty books are dropped with a
    /// warning; a book that fails to load is an error.
    pub fn load(setup: &BooksSetup) -> Result<Self, BookError> {
        let mut books = Vec::new();
        for spec in &setup.books {
            let book = match spec.kind {
                BookKind::Epd => LoadedBook::Epd(EpdBook::load(&spec.path)?),
                BookKind::Pgn => LoadedBook::Pgn(PgnBook::load(&spec.path, spec.max_ply)?),
                BookKind::Polyglot => LoadedBook::Polyglot(PolyglotBook::load(
                    &spec.path,
                    spec.max_ply,
                    spec.top100,
                )?),
            };
            if book.is_empty() {
                warn!(path = %spec.path.display(), "opening book is empty, skipping");
            } else {
                books.push(book);
            }
        }

        let all_one = Opening {
            fen: setup.all_one_fen.clone().filter(|f| !f.is_empty()),
            moves: setup
                .all_one_san_moves
                .as_deref()
                .and_then(san_line_to_moves)
                .unwrap_or_default(),
        };

        let rng = match setup.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(BookManager {
            select: setup.select,
            all_one,
            books,
            rng,
            last_pair: None,
            cached: Opening::default(),
        })
    }

    /// Total records across all loaded books.
    pub fn len(&self) -> usize {
        self.books.iter().map(LoadedBook::len).sum()
    }

    /// Whether no usable book was loaded.
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// The opening for the game identified by `pair_id`.
    ///
    /// Never fails: after five failed draws (empty books, invalid EPD
    /// records) the standard initial position is used.
    pub fn opening_for(&mut self, pair_id: u32) -> Opening {
        if self.select == BookSelect::AllOne {
            return self.all_one.clone();
        }

        let reuse_cached =
            self.select == BookSelect::SamePair && self.last_pair == Some(pair_id);
        if !reuse_cached {
            self.cached = self.fresh_draw();
        }
        self.last_pair = Some(pair_id);
        self.cached.clone()
    }

    fn fresh_draw(&mut self) -> Opening {
        if self.books.is_empty() {
            return Opening::default();
        }
        for _ in 0..5 {
            let k = self.rng.gen_range(0..self.books.len());
            if let Some(opening) = self.books[k].draw(&mut self.rng) {
                return opening;
            }
        }
        Opening::default()
    }
}
