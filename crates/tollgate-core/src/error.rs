//! Errors raised by a [`ModelDataSource`](crate::source::ModelDataSource).

/// Errors that can occur while loading configuration from the system of record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The requested record does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record that was requested (e.g. "plan").
        entity: String,
        /// Lookup key that produced no record.
        key: String,
    },

    /// The system of record could not be reached.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// The query reached the system of record but failed.
    #[error("Query error: {message}")]
    Query {
        /// Description of the query failure.
        message: String,
    },
}

impl SourceError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: impl Into<String>, key: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Query` error.
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Returns `true` if the record simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Type alias for a data-source result.
pub type SourceResult<T> = Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = SourceError::not_found("plan", 42);
        assert_eq!(err.to_string(), "plan not found: 42");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_connection_is_not_not_found() {
        let err = SourceError::connection("refused");
        assert_eq!(err.to_string(), "Connection error: refused");
        assert!(!err.is_not_found());
    }
}
