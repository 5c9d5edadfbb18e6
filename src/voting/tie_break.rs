use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of randomness for breaking ties between equally scored options.
///
/// Tie breaks make the winner of a tied poll differ between runs; that is
/// expected. Tests plug in a fixed implementation to make it repeatable.
pub trait TieBreaker: Send {
    /// Picks one index in `0..candidates`. `candidates` is never zero.
    fn pick(&mut self, candidates: usize) -> usize;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngTieBreaker;

impl TieBreaker for ThreadRngTieBreaker {
    fn pick(&mut self, candidates: usize) -> usize {
        rand::thread_rng().gen_range(0..candidates)
    }
}

/// Reproducible tie breaks from a fixed seed.
#[derive(Debug, Clone)]
pub struct SeededTieBreaker(StdRng);

impl SeededTieBreaker {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl TieBreaker for SeededTieBreaker {
    fn pick(&mut self, candidates: usize) -> usize {
        self.0.gen_range(0..candidates)
    }
}
