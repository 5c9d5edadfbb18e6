use crate::models::Ballot;
use crate::voting::{
    column_sums, pick_extreme, round_one_decimal, Extreme, TallyMethod, TieBreaker,
};

/// Each option gets an independent rating in [-1, 1]; the best average wins.
pub struct Slider;

impl TallyMethod for Slider {
    fn is_valid_ballot(&self, option_count: usize, values: &[f64]) -> bool {
        values.len() == option_count && values.iter().all(|v| (-1.0..=1.0).contains(v))
    }

    fn scores(&self, option_count: usize, votes: &[Ballot]) -> Vec<f64> {
        let voters = votes.len() as f64;
        column_sums(option_count, votes)
            .into_iter()
            .map(|sum| round_one_decimal(sum / voters))
            .collect()
    }

    fn select_winner(
        &self,
        option_count: usize,
        votes: &[Ballot],
        tie_breaker: &mut dyn TieBreaker,
    ) -> usize {
        // Every option has the same number of ratings, so the unrounded sums
        // order the options exactly like their averages.
        let sums = column_sums(option_count, votes);
        pick_extreme(&sums, Extreme::Max, tie_breaker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::tests::FirstCandidate;
    use crate::voting::SeededTieBreaker;
    use rand::{Rng, SeedableRng};

    #[test]
    fn accepts_ratings_in_range() {
        assert!(Slider.is_valid_ballot(3, &[-1.0, 0.0, 1.0]));
        assert!(Slider.is_valid_ballot(2, &[0.25, -0.75]));
    }

    #[test]
    fn rejects_out_of_range_wrong_length_and_nan() {
        assert!(!Slider.is_valid_ballot(2, &[1.5, 0.0]));
        assert!(!Slider.is_valid_ballot(2, &[-1.01, 0.0]));
        assert!(!Slider.is_valid_ballot(3, &[0.0, 0.0]));
        assert!(!Slider.is_valid_ballot(2, &[f64::NAN, 0.0]));
        assert!(!Slider.is_valid_ballot(2, &[f64::INFINITY, 0.0]));
    }

    #[test]
    fn scores_stay_in_range() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let votes: Vec<Ballot> = (0..50)
            .map(|_| (0..4).map(|_| rng.gen_range(-1.0..=1.0)).collect())
            .collect();
        for score in Slider.scores(4, &votes) {
            assert!((-1.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn winner_uses_unrounded_sums() {
        // Both average 0.1 once rounded, but the second is strictly higher.
        let votes = vec![vec![0.1, 0.14], vec![0.1, 0.14]];
        assert_eq!(Slider.scores(2, &votes), vec![0.1, 0.1]);
        assert_eq!(Slider.select_winner(2, &votes, &mut FirstCandidate), 1);
    }

    #[test]
    fn unique_maximum_ignores_tie_breaker() {
        let votes = vec![vec![-0.5, 0.5, 0.0], vec![0.0, 1.0, -1.0]];
        let mut seeded = SeededTieBreaker::new(1);
        assert_eq!(Slider.select_winner(3, &votes, &mut seeded), 1);
    }
}
