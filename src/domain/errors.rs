use thiserror::Error;

/// Domain-level errors shared across application components.
///
/// A missing contact is not an error: lookups return `Option` and only real
/// faults travel through this type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The incoming payload missed a required field or violated invariants.
    #[error("validation error: {0}")]
    Validation(String),

    /// Input exceeded guard rails such as page size bounds.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// Failure reported by the underlying contact store.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn limit(msg: impl Into<String>) -> Self {
        Self::LimitExceeded(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Short machine-readable label used by the wire interfaces.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::LimitExceeded(_) => "validation",
            Self::Storage(_) => "storage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category() {
        let err = DomainError::storage("disk full");
        assert_eq!(err.to_string(), "storage failure: disk full");
        assert_eq!(err.kind(), "storage");
    }

    #[test]
    fn test_limit_maps_to_validation_kind() {
        assert_eq!(DomainError::limit("too many").kind(), "validation");
    }
}
