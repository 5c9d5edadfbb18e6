pub mod vote;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::{CloseOutcome, PollStore};
use crate::error::{PollError, Result};
use crate::models::{Poll, PollView, VotingMethod};
use crate::voting::{self, PollResults, ThreadRngTieBreaker, TieBreaker};

// Ballots arriving while a poll closes force a recount; give up after this many.
const MAX_CLOSE_ATTEMPTS: usize = 5;

/// Entry point for everything that reads or changes a poll.
pub struct PollService {
    store: Arc<dyn PollStore>,
    tie_breaker: Mutex<Box<dyn TieBreaker>>,
}

impl PollService {
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self::with_tie_breaker(store, Box::new(ThreadRngTieBreaker))
    }

    pub fn with_tie_breaker(store: Arc<dyn PollStore>, tie_breaker: Box<dyn TieBreaker>) -> Self {
        Self {
            store,
            tie_breaker: Mutex::new(tie_breaker),
        }
    }

    pub async fn create_poll(
        &self,
        title: &str,
        options: Vec<String>,
        voting_method: VotingMethod,
        hide_scores: bool,
        ends_at: Option<DateTime<Utc>>,
    ) -> Result<Poll> {
        let poll = Poll::new(title, options, voting_method, hide_scores, ends_at)?;
        self.store.create_poll(&poll).await?;
        info!(
            "Created {} poll {} with {} options",
            poll.voting_method,
            poll.id,
            poll.options.len()
        );
        Ok(poll)
    }

    pub async fn query_poll(&self, poll_id: &str) -> Result<PollView> {
        Ok(self.store.get_poll(poll_id).await?.view())
    }

    /// Ends the poll and fixes its winner. Only one caller can succeed; every
    /// other attempt gets `AlreadyEnded`.
    pub async fn close_poll(&self, poll_id: &str) -> Result<PollResults> {
        for attempt in 1..=MAX_CLOSE_ATTEMPTS {
            let poll = self.store.get_poll(poll_id).await?;
            if poll.is_ended() {
                return Err(PollError::AlreadyEnded(poll_id.to_string()));
            }

            let results = {
                let mut tie_breaker = self.tie_breaker();
                voting::calculate_results(&poll, &mut **tie_breaker)
            };

            match self
                .store
                .close_poll(poll_id, poll.vote_count(), &results.winner, &results.scores)
                .await?
            {
                CloseOutcome::Closed => {
                    info!(
                        "Poll {} ended after {} ballots, winner: {}",
                        poll_id,
                        poll.vote_count(),
                        results.winner
                    );
                    return Ok(results);
                }
                CloseOutcome::AlreadyEnded => {
                    return Err(PollError::AlreadyEnded(poll_id.to_string()))
                }
                CloseOutcome::NotFound => return Err(PollError::NotFound(poll_id.to_string())),
                CloseOutcome::BallotsChanged => {
                    debug!(
                        "Ballots changed while closing poll {} (attempt {}), recounting",
                        poll_id, attempt
                    );
                }
            }
        }

        warn!("Giving up closing poll {} after {} attempts", poll_id, MAX_CLOSE_ATTEMPTS);
        Err(PollError::CloseContended(poll_id.to_string()))
    }

    /// Closes every open poll whose deadline has passed. Returns how many
    /// this call closed.
    pub async fn close_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let expired = self.store.expired_polls(now).await?;
        if expired.is_empty() {
            return Ok(0);
        }

        info!("Found {} expired poll(s).", expired.len());
        let mut closed = 0;
        for poll_id in expired {
            match self.close_poll(&poll_id).await {
                Ok(_) => closed += 1,
                // Someone ended it by hand in the meantime.
                Err(PollError::AlreadyEnded(_)) => debug!("Expired poll {} was already ended", poll_id),
                Err(e) => error!("Error closing expired poll {}: {}", poll_id, e),
            }
        }
        Ok(closed)
    }

    fn tie_breaker(&self) -> MutexGuard<'_, Box<dyn TieBreaker>> {
        // A panic mid tie-break leaves no state worth discarding.
        self.tie_breaker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
