//! Lookup keys for the specialized caches.

use std::fmt;

/// Lookup key for a specialized cache.
///
/// Each cache accepts exactly one variant: numeric ids for endpoints,
/// libraries and plans, hostnames for hosts and certificates. Passing the
/// other variant is a usage error, not a miss.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheCriteria {
    Id(i64),
    Hostname(String),
}

impl CacheCriteria {
    pub fn kind(&self) -> CriteriaKind {
        match self {
            CacheCriteria::Id(_) => CriteriaKind::Id,
            CacheCriteria::Hostname(_) => CriteriaKind::Hostname,
        }
    }

    pub fn as_id(&self) -> Option<i64> {
        match self {
            CacheCriteria::Id(id) => Some(*id),
            CacheCriteria::Hostname(_) => None,
        }
    }

    pub fn as_hostname(&self) -> Option<&str> {
        match self {
            CacheCriteria::Hostname(hostname) => Some(hostname),
            CacheCriteria::Id(_) => None,
        }
    }
}

impl From<i64> for CacheCriteria {
    fn from(id: i64) -> Self {
        CacheCriteria::Id(id)
    }
}

impl From<&str> for CacheCriteria {
    fn from(hostname: &str) -> Self {
        CacheCriteria::Hostname(hostname.to_string())
    }
}

impl From<String> for CacheCriteria {
    fn from(hostname: String) -> Self {
        CacheCriteria::Hostname(hostname)
    }
}

impl fmt::Display for CacheCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheCriteria::Id(id) => write!(f, "{id}"),
            CacheCriteria::Hostname(hostname) => f.write_str(hostname),
        }
    }
}

/// The variant of a [`CacheCriteria`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriteriaKind {
    Id,
    Hostname,
}

impl fmt::Display for CriteriaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriteriaKind::Id => f.write_str("an id of type i64"),
            CriteriaKind::Hostname => f.write_str("a hostname of type string"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(CacheCriteria::from(7), CacheCriteria::Id(7));
        assert_eq!(
            CacheCriteria::from("api.example.com"),
            CacheCriteria::Hostname("api.example.com".into())
        );
        assert_eq!(CacheCriteria::from(7).as_hostname(), None);
        assert_eq!(CacheCriteria::from("x").as_id(), None);
        assert_eq!(CacheCriteria::from("x").kind(), CriteriaKind::Hostname);
    }

    #[test]
    fn test_display() {
        assert_eq!(CacheCriteria::from(42).to_string(), "42");
        assert_eq!(CacheCriteria::from("foo").to_string(), "foo");
    }
}
