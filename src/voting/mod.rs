pub mod plurality;
pub mod ranked;
pub mod slider;
pub mod tie_break;
pub mod veto;

use log::debug;

use crate::models::{Ballot, Poll, VotingMethod};
pub use tie_break::{SeededTieBreaker, ThreadRngTieBreaker, TieBreaker};

/// Scores closer than this are treated as tied when picking a winner, so
/// float noise in summed slider ratings can't decide a poll.
const TIE_EPSILON: f64 = 1e-9;

/// Validation, scoring and winner selection for one voting method.
pub trait TallyMethod: Sync {
    /// True iff `values` is a well-formed ballot for a poll with
    /// `option_count` options.
    fn is_valid_ballot(&self, option_count: usize, values: &[f64]) -> bool;

    /// Display score per option, aligned with the poll's options.
    fn scores(&self, option_count: usize, votes: &[Ballot]) -> Vec<f64>;

    /// Index of the winning option. `votes` is never empty.
    fn select_winner(
        &self,
        option_count: usize,
        votes: &[Ballot],
        tie_breaker: &mut dyn TieBreaker,
    ) -> usize;
}

impl VotingMethod {
    pub fn tally(&self) -> &'static dyn TallyMethod {
        match self {
            VotingMethod::Slider => &slider::Slider,
            VotingMethod::Ranked => &ranked::Ranked,
            VotingMethod::Single => &plurality::Plurality,
            VotingMethod::Veto => &veto::Veto,
        }
    }
}

pub fn is_valid_ballot(method: VotingMethod, option_count: usize, values: &[f64]) -> bool {
    method.tally().is_valid_ballot(option_count, values)
}

pub fn tally_scores(method: VotingMethod, option_count: usize, votes: &[Ballot]) -> Vec<f64> {
    if votes.is_empty() {
        return vec![0.0; option_count];
    }
    method.tally().scores(option_count, votes)
}

pub fn compute_scores(poll: &Poll) -> Vec<f64> {
    tally_scores(poll.voting_method, poll.options.len(), poll.votes())
}

/// Label of the winning option. A poll nobody voted in is won by its first
/// option.
pub fn select_winner(poll: &Poll, tie_breaker: &mut dyn TieBreaker) -> String {
    if poll.votes().is_empty() {
        debug!("Poll {} has no ballots, first option wins by default", poll.id);
        return poll.options[0].clone();
    }

    let index = poll
        .voting_method
        .tally()
        .select_winner(poll.options.len(), poll.votes(), tie_breaker);
    poll.options[index].clone()
}

// Final outcome of a poll, ready to be stored and shown
#[derive(Debug, Clone, PartialEq)]
pub struct PollResults {
    pub winner: String,
    pub scores: Vec<f64>,
    pub summary: String,
}

pub fn calculate_results(poll: &Poll, tie_breaker: &mut dyn TieBreaker) -> PollResults {
    let winner = select_winner(poll, tie_breaker);
    let scores = compute_scores(poll);
    let summary = render_summary(poll, &winner, &scores);

    PollResults {
        winner,
        scores,
        summary,
    }
}

/// Formats the standings, best option first, with the winner in bold.
pub fn render_summary(poll: &Poll, winner: &str, scores: &[f64]) -> String {
    if poll.votes().is_empty() {
        return format!("No votes were cast. **{}** wins by default.", winner);
    }

    let mut standings: Vec<(&str, f64)> = poll
        .options
        .iter()
        .map(String::as_str)
        .zip(scores.iter().copied())
        .collect();
    match poll.voting_method {
        VotingMethod::Veto => standings.sort_by(|a, b| a.1.total_cmp(&b.1)),
        _ => standings.sort_by(|a, b| b.1.total_cmp(&a.1)),
    }

    let unit = match poll.voting_method {
        VotingMethod::Slider => "average",
        VotingMethod::Ranked => "points",
        VotingMethod::Single => "votes",
        VotingMethod::Veto => "vetoes",
    };

    let mut summary = String::new();
    for (label, score) in standings {
        if label == winner {
            summary.push_str(&format!("**{}**: {} {}\n", label, score, unit));
        } else {
            summary.push_str(&format!("{}: {} {}\n", label, score, unit));
        }
    }
    summary.push_str(&format!("\n{} voters participated.", poll.vote_count()));
    summary
}

// Shared helpers for the method implementations

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    // `+ 0.0` turns a negative zero into a plain zero.
    (value * 10.0).round() / 10.0 + 0.0
}

pub(crate) fn column_sums(option_count: usize, votes: &[Ballot]) -> Vec<f64> {
    let mut sums = vec![0.0; option_count];
    for ballot in votes {
        for (sum, value) in sums.iter_mut().zip(ballot) {
            *sum += value;
        }
    }
    sums
}

pub(crate) fn is_one_hot(option_count: usize, values: &[f64]) -> bool {
    values.len() == option_count
        && values.iter().all(|&v| v == 0.0 || v == 1.0)
        && values.iter().filter(|&&v| v == 1.0).count() == 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Extreme {
    Max,
    Min,
}

/// Index of the highest (or lowest) value; ties go to the tie breaker.
pub(crate) fn pick_extreme(
    values: &[f64],
    extreme: Extreme,
    tie_breaker: &mut dyn TieBreaker,
) -> usize {
    let best = match extreme {
        Extreme::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Extreme::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
    };
    let tied: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|&(_, &v)| (v - best).abs() <= TIE_EPSILON)
        .map(|(i, _)| i)
        .collect();

    if tied.len() > 1 {
        debug!("{} options tied at {}, breaking the tie at random", tied.len(), best);
    }
    tied[tie_breaker.pick(tied.len())]
}
