use crate::models::Ballot;
use crate::voting::{round_one_decimal, TallyMethod, TieBreaker};
use log::{debug, error};

/// Ranked ballots: every option gets a distinct rank, 1 being most preferred.
/// The winner is found by instant-runoff; the Borda-style score is only for
/// display.
pub struct Ranked;

impl TallyMethod for Ranked {
    fn is_valid_ballot(&self, option_count: usize, values: &[f64]) -> bool {
        if values.len() != option_count {
            return false;
        }
        if !values.iter().all(|v| v.is_finite() && v.fract() == 0.0) {
            return false;
        }

        let mut ranks: Vec<i64> = values.iter().map(|v| *v as i64).collect();
        ranks.sort_unstable();
        ranks.iter().copied().eq(1..=option_count as i64)
    }

    fn scores(&self, option_count: usize, votes: &[Ballot]) -> Vec<f64> {
        let voters = votes.len() as f64;
        let mut points = vec![0.0; option_count];
        for ballot in votes {
            for (total, rank) in points.iter_mut().zip(ballot) {
                *total += option_count as f64 - rank;
            }
        }
        points
            .into_iter()
            .map(|total| round_one_decimal(total / voters))
            .collect()
    }

    fn select_winner(
        &self,
        option_count: usize,
        votes: &[Ballot],
        tie_breaker: &mut dyn TieBreaker,
    ) -> usize {
        let total_voters = votes.len();
        let mut eliminated = vec![false; option_count];

        for round in 1..option_count {
            let counts = first_preferences(option_count, votes, &eliminated);
            debug!("Instant-runoff round {}: first preferences {:?}", round, counts);

            // Strict majority of all ballots, exhausted ones included.
            if let Some(winner) =
                (0..option_count).find(|&i| !eliminated[i] && counts[i] * 2 > total_voters)
            {
                debug!("Option {} reached a majority in round {}", winner, round);
                return winner;
            }

            let remaining: Vec<usize> = (0..option_count).filter(|&i| !eliminated[i]).collect();
            let fewest = remaining.iter().map(|&i| counts[i]).min().unwrap_or(0);
            let lowest: Vec<usize> = remaining
                .into_iter()
                .filter(|&i| counts[i] == fewest)
                .collect();

            let out = lowest[tie_breaker.pick(lowest.len())];
            debug!(
                "Eliminating option {} with {} first preferences ({} tied)",
                out,
                fewest,
                lowest.len()
            );
            eliminated[out] = true;
        }

        match (0..option_count).find(|&i| !eliminated[i]) {
            Some(last) => last,
            None => {
                // Unreachable: at most option_count - 1 options are ever eliminated.
                error!("Instant-runoff eliminated every option, falling back to the first");
                0
            }
        }
    }
}

/// First-preference count per option, considering only options still in the
/// running. A ballot whose ranked options are all eliminated counts for
/// nobody that round.
fn first_preferences(option_count: usize, votes: &[Ballot], eliminated: &[bool]) -> Vec<usize> {
    let mut counts = vec![0; option_count];
    for ballot in votes {
        let preferred = ballot
            .iter()
            .enumerate()
            .filter(|&(i, _)| !eliminated[i])
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);

        if let Some(option) = preferred {
            counts[option] += 1;
        }
    }
    counts
}
