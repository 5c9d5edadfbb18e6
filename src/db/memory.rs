use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::{CloseOutcome, PollStore};
use crate::error::{PollError, Result};
use crate::models::{Ballot, Poll};

/// Process-local store. Every mutation happens under the write lock, which
/// makes append and close atomic per poll.
#[derive(Default)]
pub struct MemoryStore {
    polls: RwLock<HashMap<String, Poll>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn create_poll(&self, poll: &Poll) -> Result<()> {
        self.polls
            .write()
            .await
            .insert(poll.id.clone(), poll.clone());
        Ok(())
    }

    async fn get_poll(&self, poll_id: &str) -> Result<Poll> {
        self.polls
            .read()
            .await
            .get(poll_id)
            .cloned()
            .ok_or_else(|| PollError::NotFound(poll_id.to_string()))
    }

    async fn append_ballot(&self, poll_id: &str, ballot: Ballot) -> Result<()> {
        let mut polls = self.polls.write().await;
        let poll = polls
            .get_mut(poll_id)
            .ok_or_else(|| PollError::NotFound(poll_id.to_string()))?;
        poll.append_ballot(ballot)
    }

    async fn close_poll(
        &self,
        poll_id: &str,
        expected_votes: usize,
        winner: &str,
        final_scores: &[f64],
    ) -> Result<CloseOutcome> {
        let mut polls = self.polls.write().await;
        let poll = match polls.get_mut(poll_id) {
            Some(poll) => poll,
            None => return Ok(CloseOutcome::NotFound),
        };

        if poll.is_ended() {
            return Ok(CloseOutcome::AlreadyEnded);
        }
        if poll.vote_count() != expected_votes {
            return Ok(CloseOutcome::BallotsChanged);
        }

        poll.close(winner.to_string(), final_scores.to_vec())?;
        Ok(CloseOutcome::Closed)
    }

    async fn expired_polls(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        Ok(self
            .polls
            .read()
            .await
            .values()
            .filter(|poll| poll.is_expired(now))
            .map(|poll| poll.id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VotingMethod;

    fn poll() -> Poll {
        Poll::new(
            "t",
            vec!["A".to_string(), "B".to_string()],
            VotingMethod::Single,
            false,
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn append_then_close_once() {
        let store = MemoryStore::new();
        let poll = poll();
        store.create_poll(&poll).await.unwrap();
        store.append_ballot(&poll.id, vec![0.0, 1.0]).await.unwrap();

        assert_eq!(
            store.close_poll(&poll.id, 0, "A", &[0.0, 0.0]).await.unwrap(),
            CloseOutcome::BallotsChanged
        );
        assert_eq!(
            store.close_poll(&poll.id, 1, "B", &[0.0, 1.0]).await.unwrap(),
            CloseOutcome::Closed
        );
        assert_eq!(
            store.close_poll(&poll.id, 1, "A", &[1.0, 0.0]).await.unwrap(),
            CloseOutcome::AlreadyEnded
        );
        assert_eq!(store.get_poll(&poll.id).await.unwrap().winner(), Some("B"));
    }

    #[tokio::test]
    async fn unknown_poll() {
        let store = MemoryStore::new();
        assert!(matches!(store.get_poll("x").await, Err(PollError::NotFound(_))));
        assert_eq!(
            store.close_poll("x", 0, "A", &[]).await.unwrap(),
            CloseOutcome::NotFound
        );
    }
}
