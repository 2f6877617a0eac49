//! Plain-HTTP to HTTPS redirects for the admin host and force-SSL hosts.

use std::fmt;

use tollgate_cache::{CacheCriteria, DynCaches};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectStatus {
    /// 301, cacheable by clients.
    Permanent,
    /// 307, used in dev mode so browsers do not remember it.
    Temporary,
}

impl RedirectStatus {
    pub fn code(&self) -> u16 {
        match self {
            RedirectStatus::Permanent => 301,
            RedirectStatus::Temporary => 307,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    pub status: RedirectStatus,
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.code(), self.location)
    }
}

/// Decides whether a plain-HTTP request must be sent to the TLS port.
pub struct RedirectPolicy {
    caches: DynCaches,
    admin_host: String,
    tls_port: u16,
    dev_mode: bool,
}

impl RedirectPolicy {
    pub fn new(caches: DynCaches, admin_host: impl Into<String>, tls_port: u16, dev_mode: bool) -> Self {
        Self {
            caches,
            admin_host: admin_host.into(),
            tls_port,
            dev_mode,
        }
    }

    /// Redirect for a request with the given `Host` header and path, or
    /// `None` to serve it as is.
    ///
    /// Hosts that cannot be looked up are served as is.
    pub fn redirect_for(&self, host_header: &str, path_and_query: &str) -> Option<Redirect> {
        let hostname = host_header.split(':').next().unwrap_or_default();
        if hostname.is_empty() {
            return None;
        }

        if hostname == self.admin_host {
            return Some(self.redirect(hostname, path_and_query));
        }

        match self.caches.host(&CacheCriteria::from(hostname)) {
            Ok(host) if host.force_ssl => Some(self.redirect(hostname, path_and_query)),
            Ok(_) => None,
            Err(e) => {
                warn!(hostname, error = %e, "Host lookup failed, skipping TLS redirect");
                None
            }
        }
    }

    fn redirect(&self, hostname: &str, path_and_query: &str) -> Redirect {
        let path = if path_and_query.starts_with('/') { "" } else { "/" };
        Redirect {
            location: format!("https://{hostname}:{}{path}{path_and_query}", self.tls_port),
            status: if self.dev_mode {
                RedirectStatus::Temporary
            } else {
                RedirectStatus::Permanent
            },
        }
    }
}

impl fmt::Debug for RedirectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectPolicy")
            .field("admin_host", &self.admin_host)
            .field("tls_port", &self.tls_port)
            .field("dev_mode", &self.dev_mode)
            .finish_non_exhaustive()
    }
}
