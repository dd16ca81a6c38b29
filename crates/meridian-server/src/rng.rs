//! Random outcomes for gameplay systems.
//!
//! Systems draw randomness through the narrow [`RandomSource`] capability
//! rather than a global generator. [`LocalRandom`] is backed by one `Pcg32`
//! per thread, seeded from OS entropy on first use, so simulation threads
//! never contend on shared generator state. [`SeededRandom`] and
//! [`SequenceRandom`] give reproducible outcomes for replays and tests.

use std::cell::RefCell;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Source of per-call random outcomes.
pub trait RandomSource: Send {
    /// Uniform integer in `0..bound`. Returns 0 when `bound` is 0.
    fn next_below(&mut self, bound: u32) -> u32;

    /// Fair coin: `true` on the upper of two equally likely outcomes.
    fn next_bool(&mut self) -> bool {
        self.next_below(2) == 1
    }
}

// ---------------------------------------------------------------------------
// LocalRandom
// ---------------------------------------------------------------------------

thread_local! {
    static THREAD_RNG: RefCell<Pcg32> = RefCell::new(Pcg32::from_entropy());
}

/// Handle to the calling thread's generator. Zero-sized and free to copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalRandom;

impl RandomSource for LocalRandom {
    fn next_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        THREAD_RNG.with(|rng| rng.borrow_mut().gen_range(0..bound))
    }
}

// ---------------------------------------------------------------------------
// SeededRandom
// ---------------------------------------------------------------------------

/// An owned, seeded generator. Same seed, same outcomes.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: Pcg32,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.rng.gen_range(0..bound)
    }
}

// ---------------------------------------------------------------------------
// SequenceRandom
// ---------------------------------------------------------------------------

/// Replays a fixed list of coin outcomes, cycling when exhausted.
///
/// `next_below` maps `true` to `bound - 1` and `false` to `0`, which keeps
/// [`RandomSource::next_bool`] consistent with the recorded outcomes.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    outcomes: Vec<bool>,
    cursor: usize,
}

impl SequenceRandom {
    /// # Panics
    ///
    /// Panics if `outcomes` is empty.
    pub fn new(outcomes: Vec<bool>) -> Self {
        assert!(!outcomes.is_empty(), "SequenceRandom needs at least one outcome");
        Self {
            outcomes,
            cursor: 0,
        }
    }

    /// Always `true`.
    pub fn always() -> Self {
        Self::new(vec![true])
    }

    /// Always `false`.
    pub fn never() -> Self {
        Self::new(vec![false])
    }

    /// How many outcomes have been drawn so far.
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceRandom {
    fn next_below(&mut self, bound: u32) -> u32 {
        let outcome = self.outcomes[self.cursor % self.outcomes.len()];
        self.cursor += 1;
        if outcome {
            bound.saturating_sub(1)
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_agree() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        let xs: Vec<bool> = (0..64).map(|_| a.next_bool()).collect();
        let ys: Vec<bool> = (0..64).map(|_| b.next_bool()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn coin_is_roughly_fair() {
        let mut rng = SeededRandom::new(1);
        let heads = (0..10_000).filter(|_| rng.next_bool()).count();
        assert!((4_500..5_500).contains(&heads), "heads = {heads}");
    }

    #[test]
    fn zero_bound_yields_zero() {
        assert_eq!(LocalRandom.next_below(0), 0);
        assert_eq!(SeededRandom::new(3).next_below(0), 0);
    }

    #[test]
    fn local_random_stays_in_range() {
        let mut rng = LocalRandom;
        assert!((0..1_000).all(|_| rng.next_below(6) < 6));
    }

    #[test]
    fn local_generators_are_per_thread() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..100).map(|_| LocalRandom.next_below(10)).sum::<u32>()))
            .collect();
        for h in handles {
            assert!(h.join().unwrap() < 1_000);
        }
    }

    #[test]
    fn sequence_cycles() {
        let mut rng = SequenceRandom::new(vec![true, false]);
        assert!(rng.next_bool());
        assert!(!rng.next_bool());
        assert!(rng.next_bool());
        assert_eq!(rng.draws(), 3);
    }
}
