use rand::{
    rngs::SmallRng,
    Rng,
    SeedableRng,
};

use crate::errs::TowerMapError;

/// Upon the insertion of a new node in the list, the node is replicated to
/// high levels with a certain probability as determined by a
/// `LevelGenerator`.
pub trait LevelGenerator {
    /// The highest level this generator will ever return. A map built on this
    /// generator sizes its sentinel tower as `max_level + 1` links.
    fn max_level(&self) -> usize;

    /// Draw a level for a new node, in `0..=self.max_level()`.
    fn random_level(&mut self) -> usize;
}

/// A level generator producing geometrically distributed levels.
///
/// Each coin flip that lands heads (probability `p`) grows the tower by one
/// level, stopping at the first tails or at `max_level`. Level `n` is thus
/// `p` times as likely as level `n - 1`, which is what bounds the expected
/// search depth at O(log n).
///
/// Cloning duplicates the internal RNG state; a clone continues the same
/// level sequence as its source.
#[derive(Clone)]
pub struct GeometricLevels {
    max_level: usize,
    p: f64,
    rng: SmallRng,
}

impl GeometricLevels {
    /// A generator capped at `max_level` with per-level probability `p`.
    ///
    /// # Panics
    ///
    /// `p` must be in `(0, 1)` and will panic otherwise.
    pub fn new(max_level: usize, p: f64) -> Self {
        match Self::try_new(max_level, p) {
            Ok(levels) => levels,
            Err(e) => panic!("{e}"),
        }
    }

    /// Non-panicking variant of [`GeometricLevels::new`].
    pub fn try_new(max_level: usize, p: f64) -> Result<Self, TowerMapError> {
        if p <= 0.0 || p >= 1.0 {
            return Err(TowerMapError::LevelProbabilityOutOfRange(p));
        }
        Ok(GeometricLevels {
            max_level,
            p,
            rng: SmallRng::from_entropy(),
        })
    }

    /// A deterministic generator for reproducible tower shapes. Two
    /// generators built from the same seed draw the same level sequence.
    pub fn from_seed(max_level: usize, p: f64, seed: u64) -> Result<Self, TowerMapError> {
        let mut levels = Self::try_new(max_level, p)?;
        levels.rng = SmallRng::seed_from_u64(seed);
        Ok(levels)
    }
}

impl LevelGenerator for GeometricLevels {
    fn max_level(&self) -> usize {
        self.max_level
    }

    fn random_level(&mut self) -> usize {
        let mut level = 0;
        while level < self.max_level && self.rng.gen::<f64>() < self.p {
            level += 1;
        }
        level
    }
}
