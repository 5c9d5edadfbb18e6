use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{PollError, Result};
use crate::voting;

/// One submitted vote. Its length always equals the poll's option count and
/// the meaning of each entry depends on the voting method.
pub type Ballot = Vec<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VotingMethod {
    #[default]
    Slider,
    Ranked,
    Single,
    Veto,
}

impl VotingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VotingMethod::Slider => "slider",
            VotingMethod::Ranked => "ranked",
            VotingMethod::Single => "single",
            VotingMethod::Veto => "veto",
        }
    }
}

impl fmt::Display for VotingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VotingMethod {
    type Err = PollError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slider" => Ok(VotingMethod::Slider),
            "ranked" => Ok(VotingMethod::Ranked),
            "single" => Ok(VotingMethod::Single),
            "veto" => Ok(VotingMethod::Veto),
            _ => Err(PollError::UnknownMethod(s.to_string())),
        }
    }
}

/// Lifecycle of a poll. Voting moves to closed exactly once and never back.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Open,
    Closed {
        winner: String,
        final_scores: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "PollRecord", try_from = "PollRecord")]
pub struct Poll {
    pub id: String,
    pub title: String,
    pub options: Vec<String>,
    pub voting_method: VotingMethod,
    pub hide_scores: bool,
    pub created_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    votes: Vec<Ballot>,
    state: PollState,
}

impl Poll {
    pub fn new(
        title: impl Into<String>,
        options: Vec<String>,
        voting_method: VotingMethod,
        hide_scores: bool,
        ends_at: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        let options = normalize_options(options)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title: title.into().trim().to_string(),
            options,
            voting_method,
            hide_scores,
            created_at: Utc::now(),
            ends_at,
            votes: Vec::new(),
            state: PollState::Open,
        })
    }

    pub fn votes(&self) -> &[Ballot] {
        &self.votes
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.state, PollState::Closed { .. })
    }

    pub fn winner(&self) -> Option<&str> {
        match &self.state {
            PollState::Closed { winner, .. } => Some(winner.as_str()),
            PollState::Open => None,
        }
    }

    pub fn final_scores(&self) -> Option<&[f64]> {
        match &self.state {
            PollState::Closed { final_scores, .. } => Some(final_scores.as_slice()),
            PollState::Open => None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.is_ended() && self.ends_at.map_or(false, |ends_at| ends_at <= now)
    }

    /// Validates and appends a ballot. Nothing changes on failure.
    pub fn append_ballot(&mut self, ballot: Ballot) -> Result<()> {
        if self.is_ended() {
            return Err(PollError::AlreadyEnded(self.id.clone()));
        }
        if !voting::is_valid_ballot(self.voting_method, self.options.len(), &ballot) {
            return Err(PollError::InvalidBallot {
                method: self.voting_method.to_string(),
                values: ballot,
            });
        }
        self.votes.push(ballot);
        Ok(())
    }

    /// Moves the poll into its terminal state.
    pub fn close(&mut self, winner: String, final_scores: Vec<f64>) -> Result<()> {
        if self.is_ended() {
            return Err(PollError::AlreadyEnded(self.id.clone()));
        }
        self.state = PollState::Closed {
            winner,
            final_scores,
        };
        Ok(())
    }

    /// Snapshot handed out to callers. Scores are only included once the poll
    /// has ended and the creator did not ask to hide them.
    pub fn view(&self) -> PollView {
        let scores = match (&self.state, self.hide_scores) {
            (PollState::Closed { final_scores, .. }, false) => Some(final_scores.clone()),
            _ => None,
        };

        PollView {
            id: self.id.clone(),
            title: self.title.clone(),
            options: self.options.clone(),
            voting_method: self.voting_method,
            hide_scores: self.hide_scores,
            vote_count: self.votes.len(),
            ended: self.is_ended(),
            winner: self.winner().map(str::to_string),
            scores,
            ends_at: self.ends_at,
        }
    }
}

fn normalize_options(options: Vec<String>) -> Result<Vec<String>> {
    let options: Vec<String> = options.into_iter().map(|o| o.trim().to_string()).collect();

    if options.len() < 2 {
        return Err(PollError::TooFewOptions(options.len()));
    }
    if options.iter().any(|o| o.is_empty()) {
        return Err(PollError::EmptyOption);
    }

    let mut seen = HashSet::new();
    for option in &options {
        if !seen.insert(option.as_str()) {
            return Err(PollError::DuplicateOption(option.clone()));
        }
    }
    Ok(options)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: String,
    pub title: String,
    pub options: Vec<String>,
    pub voting_method: VotingMethod,
    pub hide_scores: bool,
    pub vote_count: usize,
    pub ended: bool,
    pub winner: Option<String>,
    pub scores: Option<Vec<f64>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Flat persisted shape of a poll. Records written before polls had a voting
/// method deserialize as slider polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollRecord {
    pub id: String,
    pub title: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub voting_method: VotingMethod,
    #[serde(default)]
    pub hide_scores: bool,
    #[serde(default)]
    pub votes: Vec<Ballot>,
    #[serde(default)]
    pub ended: bool,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub final_scores: Option<Vec<f64>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

impl From<Poll> for PollRecord {
    fn from(poll: Poll) -> Self {
        let (ended, winner, final_scores) = match poll.state {
            PollState::Open => (false, None, None),
            PollState::Closed {
                winner,
                final_scores,
            } => (true, Some(winner), Some(final_scores)),
        };

        PollRecord {
            id: poll.id,
            title: poll.title,
            options: poll.options,
            voting_method: poll.voting_method,
            hide_scores: poll.hide_scores,
            votes: poll.votes,
            ended,
            winner,
            final_scores,
            created_at: poll.created_at,
            ends_at: poll.ends_at,
        }
    }
}

impl TryFrom<PollRecord> for Poll {
    type Error = PollError;

    fn try_from(record: PollRecord) -> Result<Self> {
        let corrupt = |reason: &str| PollError::CorruptRecord {
            id: record.id.clone(),
            reason: reason.to_string(),
        };

        if record.options.len() < 2 {
            return Err(corrupt("fewer than 2 options"));
        }
        if record.votes.iter().any(|v| v.len() != record.options.len()) {
            return Err(corrupt("ballot length does not match option count"));
        }

        let state = match (record.ended, record.winner.clone()) {
            (false, None) => PollState::Open,
            (true, Some(winner)) => {
                if !record.options.contains(&winner) {
                    return Err(corrupt("winner is not one of the options"));
                }
                // Records closed before final scores were stored get them recomputed.
                let final_scores = record.final_scores.clone().unwrap_or_else(|| {
                    voting::tally_scores(record.voting_method, record.options.len(), &record.votes)
                });
                PollState::Closed {
                    winner,
                    final_scores,
                }
            }
            (true, None) => return Err(corrupt("ended without a winner")),
            (false, Some(_)) => return Err(corrupt("winner set on an open poll")),
        };

        Ok(Poll {
            id: record.id,
            title: record.title,
            options: record.options,
            voting_method: record.voting_method,
            hide_scores: record.hide_scores,
            created_at: record.created_at,
            ends_at: record.ends_at,
            votes: record.votes,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn new_poll_trims_and_starts_open() {
        let poll = Poll::new(" Lunch ", options(&[" Pizza", "Sushi "]), VotingMethod::Single, false, None)
            .unwrap();
        assert_eq!(poll.title, "Lunch");
        assert_eq!(poll.options, vec!["Pizza", "Sushi"]);
        assert!(!poll.is_ended());
        assert_eq!(poll.winner(), None);
        assert_eq!(poll.vote_count(), 0);
    }

    #[test]
    fn new_poll_rejects_bad_options() {
        assert!(matches!(
            Poll::new("t", options(&["Only"]), VotingMethod::Slider, false, None),
            Err(PollError::TooFewOptions(1))
        ));
        assert!(matches!(
            Poll::new("t", options(&["A", "  "]), VotingMethod::Slider, false, None),
            Err(PollError::EmptyOption)
        ));
        assert!(matches!(
            Poll::new("t", options(&["A", "A "]), VotingMethod::Slider, false, None),
            Err(PollError::DuplicateOption(_))
        ));
    }

    #[test]
    fn voting_method_parses_known_names_only() {
        assert_eq!("Ranked".parse::<VotingMethod>().unwrap(), VotingMethod::Ranked);
        assert_eq!("veto".parse::<VotingMethod>().unwrap(), VotingMethod::Veto);
        assert!(matches!(
            "approval".parse::<VotingMethod>(),
            Err(PollError::UnknownMethod(_))
        ));
    }

    #[test]
    fn append_rejects_invalid_ballot_without_change() {
        let mut poll = Poll::new("t", options(&["A", "B"]), VotingMethod::Single, false, None).unwrap();
        assert!(poll.append_ballot(vec![1.0, 1.0]).is_err());
        assert!(poll.append_ballot(vec![1.0]).is_err());
        assert_eq!(poll.vote_count(), 0);
        poll.append_ballot(vec![0.0, 1.0]).unwrap();
        assert_eq!(poll.vote_count(), 1);
    }

    #[test]
    fn closed_poll_is_terminal() {
        let mut poll = Poll::new("t", options(&["A", "B"]), VotingMethod::Single, false, None).unwrap();
        poll.append_ballot(vec![1.0, 0.0]).unwrap();
        poll.close("A".into(), vec![1.0, 0.0]).unwrap();

        assert!(matches!(poll.append_ballot(vec![0.0, 1.0]), Err(PollError::AlreadyEnded(_))));
        assert!(matches!(poll.close("B".into(), vec![]), Err(PollError::AlreadyEnded(_))));
        assert_eq!(poll.winner(), Some("A"));
        assert_eq!(poll.vote_count(), 1);
    }

    #[test]
    fn view_hides_scores_until_ended_and_when_requested() {
        let mut shown = Poll::new("t", options(&["A", "B"]), VotingMethod::Single, false, None).unwrap();
        assert_eq!(shown.view().scores, None);
        shown.close("A".into(), vec![0.0, 0.0]).unwrap();
        assert_eq!(shown.view().scores, Some(vec![0.0, 0.0]));

        let mut hidden = Poll::new("t", options(&["A", "B"]), VotingMethod::Single, true, None).unwrap();
        hidden.close("B".into(), vec![0.0, 0.0]).unwrap();
        let view = hidden.view();
        assert_eq!(view.scores, None);
        assert_eq!(view.winner.as_deref(), Some("B"));
    }

    #[test]
    fn record_round_trips_through_json() {
        let mut poll = Poll::new("t", options(&["A", "B", "C"]), VotingMethod::Ranked, true, None).unwrap();
        poll.append_ballot(vec![1.0, 2.0, 3.0]).unwrap();
        poll.close("A".into(), vec![2.0, 1.0, 0.0]).unwrap();

        let json = serde_json::to_string(&poll).unwrap();
        let back: Poll = serde_json::from_str(&json).unwrap();
        assert_eq!(back, poll);
    }

    #[test]
    fn legacy_record_defaults_to_slider() {
        let json = r#"{"id":"old","title":"Lunch","options":["Pizza","Sushi"],"votes":[[1,-1]]}"#;
        let poll: Poll = serde_json::from_str(json).unwrap();
        assert_eq!(poll.voting_method, VotingMethod::Slider);
        assert!(!poll.is_ended());
        assert_eq!(poll.votes(), &[vec![1.0, -1.0]]);
    }

    #[test]
    fn ended_record_without_winner_is_corrupt() {
        let json = r#"{"id":"bad","title":"t","options":["A","B"],"ended":true}"#;
        assert!(serde_json::from_str::<Poll>(json).is_err());
    }
}
