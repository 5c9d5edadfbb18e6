use chrono::Utc;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::handlers::PollService;

/// Periodically ends polls whose deadline has passed. Runs until the task is
/// dropped.
pub async fn check_expired_polls_task(service: Arc<PollService>, check_interval: Duration) {
    info!(
        "Starting background task to check for expired polls every {:?}",
        check_interval
    );
    let mut interval = interval(check_interval);

    loop {
        interval.tick().await;
        let now = Utc::now();

        match service.close_expired(now).await {
            Ok(0) => {}
            Ok(closed) => info!("Ended {} expired poll(s) at {}", closed, now.to_rfc3339()),
            Err(e) => error!("Failed to query for expired polls: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, PollStore};
    use crate::models::{Poll, VotingMethod};

    #[tokio::test]
    async fn ends_expired_polls_in_the_background() {
        let store = Arc::new(MemoryStore::new());
        let poll = Poll::new(
            "Lunch",
            vec!["Pizza".to_string(), "Sushi".to_string()],
            VotingMethod::Single,
            false,
            Some(Utc::now() - chrono::Duration::seconds(1)),
        )
        .unwrap();
        store.create_poll(&poll).await.unwrap();

        let service = Arc::new(PollService::new(store.clone()));
        let task = tokio::spawn(check_expired_polls_task(
            service,
            Duration::from_millis(10),
        ));

        let mut ended = false;
        for _ in 0..100 {
            if store.get_poll(&poll.id).await.unwrap().is_ended() {
                ended = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        task.abort();

        assert!(ended);
        let stored = store.get_poll(&poll.id).await.unwrap();
        assert_eq!(stored.winner(), Some("Pizza"));
    }
}
