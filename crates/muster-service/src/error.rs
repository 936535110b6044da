use thiserror::Error;

/// The single externally visible failure status. Validation, not-found,
/// constraint and store errors all flatten into it, message carrying the
/// original cause. The store-level taxonomy stays typed underneath, so
/// kind-specific statuses would be a mapping change here and nowhere else.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub(crate) fn internal(context: &str, cause: impl std::fmt::Display) -> Self {
        ServiceError::Internal(format!("{context}: {cause}"))
    }
}
