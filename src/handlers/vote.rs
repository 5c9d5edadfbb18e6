use chrono::Utc;
use log::{info, warn};

use crate::error::{PollError, Result};
use crate::handlers::PollService;
use crate::models::Ballot;

impl PollService {
    /// Validates a ballot and appends it to an open poll. Nothing is stored
    /// when the ballot is rejected.
    pub async fn submit_ballot(&self, poll_id: &str, values: Ballot) -> Result<()> {
        let poll = self.store.get_poll(poll_id).await?;

        // Past its deadline but not yet picked up by the poll ender.
        if poll.is_expired(Utc::now()) {
            return Err(PollError::AlreadyEnded(poll_id.to_string()));
        }

        match self.store.append_ballot(poll_id, values).await {
            Ok(()) => {
                info!("Recorded {} ballot for poll {}", poll.voting_method, poll_id);
                Ok(())
            }
            Err(e) => {
                warn!("Rejected ballot for poll {}: {}", poll_id, e);
                Err(e)
            }
        }
    }
}
