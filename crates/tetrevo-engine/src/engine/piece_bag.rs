use std::{collections::VecDeque, fmt};

use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
    seq::SliceRandom,
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PieceKind;

/// Queue of upcoming pieces driven by the 7-bag randomizer.
///
/// # 7-Bag System
///
/// 1. A "set" holds each of the 7 piece kinds once, in base order
///    (I, O, T, S, Z, J, L)
/// 2. The set is shuffled and appended to the queue
/// 3. Before every draw, a new set is appended if fewer than 7 pieces remain
///
/// Since sets are only ever appended whole, every aligned group of 7
/// consecutive draws is a permutation of all kinds.
///
/// # Snapshots
///
/// The shuffling PRNG lives inside the bag, so a clone draws exactly the same
/// pieces as its source. Fitness evaluation relies on this: every genotype of a
/// generation replays against a clone of the same bag.
///
/// # Example
///
/// ```
/// use tetrevo_engine::{BagSeed, PieceBag};
///
/// let mut bag = PieceBag::with_sets(BagSeed::new(7), 3);
/// let mut snapshot = bag.clone();
///
/// let drawn: Vec<_> = (0..30).map(|_| bag.pop_next()).collect();
/// let replayed: Vec<_> = (0..30).map(|_| snapshot.pop_next()).collect();
/// assert_eq!(drawn, replayed);
/// ```
#[derive(Debug, Clone)]
pub struct PieceBag {
    rng: Pcg32,
    queue: VecDeque<PieceKind>,
}

/// Seed for deterministic piece generation.
///
/// Serialized as a 16-character hexadecimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BagSeed(u64);

impl BagSeed {
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BagSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for BagSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BagSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        if hex_str.len() != 16 {
            return Err(serde::de::Error::custom(format!(
                "invalid hex: expected 16 characters, got {}",
                hex_str.len()
            )));
        }
        let value = u64::from_str_radix(&hex_str, 16)
            .map_err(|e| serde::de::Error::custom(format!("invalid hex: {hex_str} ({e})")))?;
        Ok(Self(value))
    }
}

impl Distribution<BagSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> BagSeed {
        BagSeed(rng.next_u64())
    }
}

impl PieceBag {
    /// Creates an empty bag; the first draw appends the first set.
    #[must_use]
    pub fn with_seed(seed: BagSeed) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed.0),
            queue: VecDeque::with_capacity(PieceKind::LEN * 2),
        }
    }

    /// Creates a bag pre-filled with `sets` shuffled sets.
    #[must_use]
    pub fn with_sets(seed: BagSeed, sets: usize) -> Self {
        let mut bag = Self::with_seed(seed);
        for _ in 0..sets {
            bag.push_set();
        }
        bag
    }

    /// Number of sets to prefill for a sequence of `piece_count` locks:
    /// `max(3, ceil(piece_count / 7))`.
    #[must_use]
    pub fn sets_for(piece_count: usize) -> usize {
        usize::max(3, piece_count.div_ceil(PieceKind::LEN))
    }

    /// Appends one shuffled set of all 7 kinds.
    pub fn push_set(&mut self) {
        let mut set = PieceKind::ALL;
        set.shuffle(&mut self.rng);
        self.queue.extend(set);
    }

    /// Draws the next piece, refilling first when fewer than 7 remain.
    ///
    /// # Panics
    ///
    /// Never in practice: the refill guarantees a non-empty queue.
    pub fn pop_next(&mut self) -> PieceKind {
        if self.queue.len() < PieceKind::LEN {
            self.push_set();
        }
        self.queue
            .pop_front()
            .expect("piece bag should never be empty after a refill")
    }

    /// Upcoming pieces in draw order.
    pub fn next_pieces(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.queue.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
