//! Uniform random draws behind a seam so games can be replayed deterministically in tests.

use std::sync::Mutex;

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Source of uniform random integers used for every draw a game performs
/// (secret numbers, randomized bets, ultimate-mode re-rolls).
pub trait Dice: Send + Sync {
    /// Draw a uniform integer in the inclusive range `[min, max]`.
    ///
    /// When `min > max` the lower bound is returned so callers never panic on
    /// degenerate ranges (e.g. an ultimate-mode range re-rolled down to 0).
    fn roll(&self, min: u32, max: u32) -> u32;
}

/// Production dice backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDice;

impl Dice for ThreadDice {
    fn roll(&self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        rand::rng().random_range(min..=max)
    }
}

/// Deterministic dice seeded once, for reproducible games and tests.
#[derive(Debug)]
pub struct SeededDice {
    rng: Mutex<StdRng>,
}

impl SeededDice {
    /// Build a dice source from a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Dice for SeededDice {
    fn roll(&self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random_range(min..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolls_stay_within_bounds() {
        let dice = SeededDice::new(7);
        for _ in 0..1000 {
            let value = dice.roll(10, 20);
            assert!((10..=20).contains(&value));
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let a = SeededDice::new(42);
        let b = SeededDice::new(42);
        let left: Vec<u32> = (0..16).map(|_| a.roll(0, 100)).collect();
        let right: Vec<u32> = (0..16).map(|_| b.roll(0, 100)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn degenerate_range_returns_lower_bound() {
        assert_eq!(ThreadDice.roll(5, 5), 5);
        assert_eq!(ThreadDice.roll(9, 3), 9);
    }
}
