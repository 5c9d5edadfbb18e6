use crate::models::Ballot;
use crate::voting::{column_sums, is_one_hot, pick_extreme, Extreme, TallyMethod, TieBreaker};

/// Each ballot vetoes one option; the option with the fewest vetoes survives.
pub struct Veto;

impl TallyMethod for Veto {
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
        pick_extreme(&self.scores(option_count, votes), Extreme::Min, tie_breaker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::tests::{FirstCandidate, LastCandidate};

    #[test]
    fn ballot_vetoes_exactly_one_option() {
        assert!(Veto.is_valid_ballot(2, &[1.0, 0.0]));
        assert!(!Veto.is_valid_ballot(2, &[1.0, 1.0]));
        assert!(!Veto.is_valid_ballot(2, &[0.0, 0.0]));
    }

    #[test]
    fn unvetoed_option_wins() {
        let votes = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
        assert_eq!(Veto.select_winner(3, &votes, &mut FirstCandidate), 2);
    }

    #[test]
    fn tied_minimum_goes_to_tie_breaker() {
        let votes = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert_eq!(Veto.select_winner(2, &votes, &mut FirstCandidate), 0);
        assert_eq!(Veto.select_winner(2, &votes, &mut LastCandidate), 1);
    }
}
