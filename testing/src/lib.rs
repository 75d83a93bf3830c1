//! # Dropsim Testing
//!
//! Deterministic test doubles for the environment traits, so every test
//! that touches deadlines, timestamps or the synthetic event source runs
//! the same way every time.
//!
//! - [`FixedClock`]: a clock pinned to one instant
//! - [`SteppingClock`]: a clock tests advance by hand
//! - [`ScriptedRandom`]: replays a fixed sequence of rolls
//! - [`SeededRandom`]: a real PRNG behind a fixed seed
//!
//! News-provider doubles live next to the aggregator tests in
//! `dropsim-engine`, where the provider trait is defined.

pub mod helpers;

use chrono::{DateTime, Duration, TimeZone, Utc};
use dropsim_core::environment::{Clock, RandomSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// A clock pinned to one instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Pins the clock to the given instant.
    #[must_use]
    pub const fn at(time: DateTime<Utc>) -> Self {
        Self { time }
    }

    /// A convenient fixed instant: 2025-06-15 12:00:00 UTC.
    #[must_use]
    pub fn midday() -> Self {
        Self::at(Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).single().map_or_else(Utc::now, |t| t))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// A clock tests advance by hand.
#[derive(Debug)]
pub struct SteppingClock {
    time: Mutex<DateTime<Utc>>,
}

impl SteppingClock {
    /// Starts the clock at the given instant.
    #[must_use]
    pub fn starting_at(time: DateTime<Utc>) -> Self {
        Self {
            time: Mutex::new(time),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
        *time += by;
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Replays a fixed sequence of rolls, then keeps returning `1.0` (which
/// never triggers a probability check) once the script runs out.
#[derive(Debug)]
pub struct ScriptedRandom {
    rolls: Mutex<Vec<f64>>,
}

impl ScriptedRandom {
    /// Creates a source that replays `rolls` in order.
    #[must_use]
    pub fn new(rolls: Vec<f64>) -> Self {
        let mut reversed = rolls;
        reversed.reverse();
        Self {
            rolls: Mutex::new(reversed),
        }
    }

    /// A source whose every roll misses any probability below 1.0.
    #[must_use]
    pub fn never_triggers() -> Self {
        Self::new(Vec::new())
    }
}

impl RandomSource for ScriptedRandom {
    fn roll(&self) -> f64 {
        self.rolls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or(1.0)
    }
}

/// A real PRNG behind a fixed seed, for tests that want realistic but
/// reproducible randomness.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Creates a source seeded with `seed`.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn roll(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0.0..1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_never_moves() {
        let clock = FixedClock::midday();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn stepping_clock_advances() {
        let clock = SteppingClock::starting_at(FixedClock::midday().now());
        let before = clock.now();
        clock.advance(Duration::hours(3));
        assert_eq!(clock.now() - before, Duration::hours(3));
    }

    #[test]
    fn scripted_random_replays_then_misses() {
        let source = ScriptedRandom::new(vec![0.01, 0.5]);
        assert!((source.roll() - 0.01).abs() < f64::EPSILON);
        assert!((source.roll() - 0.5).abs() < f64::EPSILON);
        assert!((source.roll() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn seeded_random_is_reproducible() {
        let a = SeededRandom::from_seed(42);
        let b = SeededRandom::from_seed(42);
        for _ in 0..10 {
            assert!((a.roll() - b.roll()).abs() < f64::EPSILON);
        }
    }
}
