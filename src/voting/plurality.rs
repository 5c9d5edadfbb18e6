use crate::models::Ballot;
use crate::voting::{column_sums, is_one_hot, pick_extreme, Extreme, TallyMethod, TieBreaker};

/// Single choice: each ballot selects one option and the most selected wins.
pub struct Plurality;

impl TallyMethod for Plurality {
    fn is_valid_ballot(&self, option_count: usize, values: &[f64]) -> bool {
        is_one_hot(option_count, values)
    }

    fn scores(&self, option_count: usize, votes: &[Ballot]) -> Vec<f64> {
        column_sums(option_count, votes)
    }

    fn select_winner(
        &self,
        option_count: usize,
        votes: &[Ballot],
        tie_breaker: &mut dyn TieBreaker,
    ) -> usize {
        pick_extreme(&self.scores(option_count, votes), Extreme::Max, tie_breaker)
    }
}
