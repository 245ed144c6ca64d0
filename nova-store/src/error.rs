use thiserror::Error;

/// Store failures, classified so the scheduler can decide between a bounded
/// retry and dead-lettering. Constraint violations on a pre-validated write
/// path are not retryable.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("scan mismatch: {0}")]
    ScanMismatch(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_) | StoreError::ScanMismatch(_))
    }

    /// sqlstate class 23 is integrity-constraint violation; everything else
    /// coming back from the driver is assumed to be recoverable by retry.
    pub fn from_sqlx(err: sqlx::Error) -> StoreError {
        match &err {
            sqlx::Error::Database(db_err) => {
                let is_constraint = db_err.code().map(|code| code.starts_with("23")).unwrap_or(false);
                if is_constraint {
                    StoreError::Constraint(db_err.to_string())
                } else {
                    StoreError::Transient(db_err.to_string())
                }
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => StoreError::ScanMismatch(err.to_string()),
            _ => StoreError::Transient(err.to_string()),
        }
    }
}

/// True when an `anyhow` error chain bottoms out in a retryable store error.
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<StoreError>().map(StoreError::is_transient).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification_survives_anyhow_wrapping() {
        let err = anyhow::Error::from(StoreError::Transient("connection reset".to_string()));
        assert!(is_transient_error(&err));

        let err = anyhow::Error::from(StoreError::Constraint("duplicate key".to_string()));
        assert!(!is_transient_error(&err));

        let err = anyhow::anyhow!("some logic error");
        assert!(!is_transient_error(&err));
    }
}
