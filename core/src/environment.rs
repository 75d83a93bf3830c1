//! Injected environment dependencies.
//!
//! Domain logic never reads wall-clock time or an ambient random generator
//! directly: it receives a [`Clock`] and a [`RandomSource`] and stays
//! deterministic under test. Production implementations live here;
//! deterministic test doubles live in `dropsim-testing`.

use chrono::{DateTime, Utc};

/// Abstracts time so deadlines and timestamps are testable.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock reading the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Abstracts randomness for the synthetic event source.
///
/// One roll is one independent uniform draw; callers compare it against a
/// trigger probability. Keeping the interface to a single draw makes
/// scripted test doubles trivial.
pub trait RandomSource: Send + Sync {
    /// A uniform draw from `[0.0, 1.0)`.
    fn roll(&self) -> f64;
}

/// Production randomness over the thread-local generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn roll(&self) -> f64 {
        rand::random::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn thread_random_stays_in_unit_interval() {
        let source = ThreadRandom;
        for _ in 0..1000 {
            let roll = source.roll();
            assert!((0.0..1.0).contains(&roll));
        }
    }
}
