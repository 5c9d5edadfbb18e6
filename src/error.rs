use thiserror::Error;

/// Broad category of a failure, so callers can tell "your vote was invalid"
/// apart from "this poll already ended".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Malformed,
    Stale,
    Storage,
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("a poll needs at least 2 options, got {0}")]
    TooFewOptions(usize),

    #[error("poll options must not be empty")]
    EmptyOption,

    #[error("duplicate poll option: {0}")]
    DuplicateOption(String),

    #[error("unknown voting method: {0}")]
    UnknownMethod(String),

    #[error("invalid ballot for a {method} poll: {values:?}")]
    InvalidBallot { method: String, values: Vec<f64> },

    #[error("poll {0} not found")]
    NotFound(String),

    #[error("poll {0} has already ended")]
    AlreadyEnded(String),

    #[error("poll {0} kept receiving ballots while closing, try again")]
    CloseContended(String),

    #[error("corrupt poll record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PollError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PollError::TooFewOptions(_)
            | PollError::EmptyOption
            | PollError::DuplicateOption(_)
            | PollError::UnknownMethod(_)
            | PollError::InvalidBallot { .. } => ErrorKind::Malformed,
            PollError::NotFound(_)
            | PollError::AlreadyEnded(_)
            | PollError::CloseContended(_) => ErrorKind::Stale,
            PollError::CorruptRecord { .. }
            | PollError::Database(_)
            | PollError::Serialization(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, PollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_and_malformed_are_reported_distinctly() {
        assert_eq!(PollError::AlreadyEnded("p".into()).kind(), ErrorKind::Stale);
        assert_eq!(PollError::NotFound("p".into()).kind(), ErrorKind::Stale);
        let invalid = PollError::InvalidBallot {
            method: "single".into(),
            values: vec![1.0, 1.0],
        };
        assert_eq!(invalid.kind(), ErrorKind::Malformed);
        assert_eq!(PollError::TooFewOptions(1).kind(), ErrorKind::Malformed);
    }
}
