//! Cache error types.

use tollgate_core::SourceError;

use crate::criteria::CriteriaKind;

/// Errors returned by cache lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The criteria variant does not match what the cache is keyed by. This
    /// is a programming error; the cache is left untouched.
    #[error("{cache} cache criteria should be {expected}, got {actual}")]
    InvalidCriteria {
        /// Name of the cache that rejected the criteria.
        cache: &'static str,
        /// Variant the cache is keyed by.
        expected: CriteriaKind,
        /// Variant that was supplied.
        actual: CriteriaKind,
    },

    /// The data source failed. Nothing was cached, so a retry reaches the
    /// data source again.
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl CacheError {
    #[must_use]
    pub fn invalid_criteria(cache: &'static str, expected: CriteriaKind, actual: CriteriaKind) -> Self {
        Self::InvalidCriteria {
            cache,
            expected,
            actual,
        }
    }

    pub fn is_invalid_criteria(&self) -> bool {
        matches!(self, Self::InvalidCriteria { .. })
    }

    /// The underlying data-source error, if any.
    pub fn source_error(&self) -> Option<&SourceError> {
        match self {
            Self::Source(e) => Some(e),
            Self::InvalidCriteria { .. } => None,
        }
    }
}

/// Type alias for a cache result.
pub type CacheResult<T> = Result<T, CacheError>;
