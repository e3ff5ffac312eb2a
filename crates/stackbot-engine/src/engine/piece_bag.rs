use std::{collections::VecDeque, fmt, str::FromStr};

use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
    seq::SliceRandom as _,
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::shape::{PieceKind, Shape};

/// Supplier of the pieces a [`GameState`](crate::GameState) plays.
pub trait PieceSource {
    fn next_piece(&mut self) -> Shape;
}

/// Kinds allowed to open a bag.
const OPENING_KINDS: [PieceKind; 4] = [PieceKind::I, PieceKind::J, PieceKind::L, PieceKind::T];

/// Shuffled 7-bag piece generator.
///
/// Every bag holds each of the seven kinds exactly once. The first piece of a
/// bag is always one of I, J, L or T, which keeps S, Z and O from opening a
/// bag on an empty floor; the remaining six are shuffled.
///
/// # Example
///
/// ```
/// use stackbot_engine::{PieceBag, PieceKind};
///
/// let mut bag = PieceBag::new();
/// let mut drawn: Vec<_> = (0..7).map(|_| bag.pop_next()).collect();
/// drawn.sort_by_key(|kind| kind.as_char());
///
/// let mut all = PieceKind::ALL.to_vec();
/// all.sort_by_key(|kind| kind.as_char());
/// assert_eq!(drawn, all);
/// ```
#[derive(Debug, Clone)]
pub struct PieceBag {
    rng: Pcg32,
    bag: VecDeque<PieceKind>,
}

impl Default for PieceBag {
    fn default() -> Self {
        Self::new()
    }
}

impl PieceBag {
    /// Creates a bag with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::rng().random())
    }

    /// Like [`Self::new`], but with a specific seed for a reproducible sequence.
    #[must_use]
    pub fn with_seed(seed: PieceSeed) -> Self {
        Self {
            rng: Pcg32::from_seed(seed.0),
            bag: VecDeque::with_capacity(PieceKind::LEN),
        }
    }

    fn fill_bag(&mut self) {
        let opening = OPENING_KINDS[self.rng.random_range(0..OPENING_KINDS.len())];
        let mut rest: Vec<_> = PieceKind::ALL
            .into_iter()
            .filter(|kind| *kind != opening)
            .collect();
        rest.shuffle(&mut self.rng);
        self.bag.push_back(opening);
        self.bag.extend(rest);
    }

    /// Draws the next kind, refilling the bag once it runs out.
    pub fn pop_next(&mut self) -> PieceKind {
        if self.bag.is_empty() {
            self.fill_bag();
        }
        self.bag
            .pop_front()
            .expect("piece bag is refilled before drawing")
    }

    /// Returns the kinds left in the current bag.
    pub fn remaining(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.bag.iter().copied()
    }
}

impl PieceSource for PieceBag {
    fn next_piece(&mut self) -> Shape {
        Shape::canonical(self.pop_next())
    }
}

/// Deals a fixed list of kinds over and over.
///
/// Handy for scripted games and for tests that need to know what comes next.
#[derive(Debug, Clone)]
pub struct PieceCycle {
    kinds: Vec<PieceKind>,
    next: usize,
}

impl PieceCycle {
    /// # Panics
    ///
    /// Panics if `kinds` is empty.
    #[must_use]
    pub fn new(kinds: impl IntoIterator<Item = PieceKind>) -> Self {
        let kinds: Vec<_> = kinds.into_iter().collect();
        assert!(!kinds.is_empty(), "piece cycle needs at least one kind");
        Self { kinds, next: 0 }
    }
}

impl PieceSource for PieceCycle {
    fn next_piece(&mut self) -> Shape {
        let kind = self.kinds[self.next];
        self.next = (self.next + 1) % self.kinds.len();
        Shape::canonical(kind)
    }
}

/// Seed for deterministic piece generation.
///
/// 16 bytes, written as a 32 character hex string in JSON and on the command
/// line.
///
/// # Example
///
/// ```
/// use stackbot_engine::{PieceBag, PieceSeed};
/// use rand::Rng as _;
///
/// let seed: PieceSeed = rand::rng().random();
/// let mut a = PieceBag::with_seed(seed);
/// let mut b = PieceBag::with_seed(seed);
/// assert!((0..20).all(|_| a.pop_next() == b.pop_next()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceSeed([u8; 16]);

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("invalid hex seed {input:?}: expected 32 hex characters")]
pub struct ParsePieceSeedError {
    input: String,
}

impl PieceSeed {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns an endless, reproducible sequence of seeds derived from this one.
    pub fn derive_seeds(self) -> impl Iterator<Item = Self> {
        let mut rng = Pcg32::from_seed(self.0);
        std::iter::repeat_with(move || rng.random())
    }
}

impl fmt::Display for PieceSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

impl FromStr for PieceSeed {
    type Err = ParsePieceSeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePieceSeedError {
            input: s.to_owned(),
        };
        if s.len() != 32 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let num = u128::from_str_radix(s, 16).map_err(|_| err())?;
        Ok(Self(num.to_be_bytes()))
    }
}

impl Serialize for PieceSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PieceSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        hex_str.parse().map_err(serde::de::Error::custom)
    }
}

impl Distribution<PieceSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        PieceSeed(seed)
    }
}
