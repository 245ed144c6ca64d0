use nova_domain::ValidationError;
use nova_store::is_transient_error;
use thiserror::Error;

/// Everything a mission can fail with. Validation and precondition failures
/// surface to the caller; transient failures are retried by the scheduler
/// with bounded backoff; fatal ones dead-letter the mission.
#[derive(Error, Debug)]
pub enum MissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate element: {0}")]
    Duplicate(String),

    #[error("recall refused: the mission is already resolving or returning")]
    RecallRefused,

    #[error("store deadline exceeded")]
    DeadlineExceeded,

    #[error("transient failure: {0}")]
    Transient(anyhow::Error),

    #[error("fatal failure: {0}")]
    Fatal(anyhow::Error),
}

impl MissionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, MissionError::Transient(_) | MissionError::DeadlineExceeded)
    }

    /// Classifies a store-layer error chain by what sits at its root.
    pub fn from_store(err: anyhow::Error) -> MissionError {
        if is_transient_error(&err) {
            MissionError::Transient(err)
        } else {
            MissionError::Fatal(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_store::StoreError;

    #[test]
    fn store_errors_classify_by_their_root_cause() {
        let transient = MissionError::from_store(anyhow::Error::from(StoreError::Transient("timeout".to_string())));
        assert!(transient.is_transient());

        let fatal = MissionError::from_store(anyhow::Error::from(StoreError::Constraint("fk violation".to_string())));
        assert!(!fatal.is_transient());
    }

    #[test]
    fn validation_errors_are_not_retryable() {
        let err = MissionError::from(ValidationError::EmptyFleet);
        assert!(!err.is_transient());
    }
}
