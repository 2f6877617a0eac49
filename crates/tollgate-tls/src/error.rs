//! TLS error types.

use tollgate_cache::CacheError;

/// Errors raised while resolving a certificate for a handshake.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// The host exists but has no certificate or private key configured.
    #[error("SSL not configured for {hostname}")]
    SslNotConfigured { hostname: String },

    /// A server name matched a static domain that was never seeded.
    #[error("no certificate configured for {domain}")]
    StaticCertificateMissing { domain: String },

    #[error("Invalid certificate: {message}")]
    InvalidCertificate { message: String },

    #[error("Invalid private key: {message}")]
    InvalidPrivateKey { message: String },

    /// Looking up the host failed.
    #[error(transparent)]
    Lookup(#[from] CacheError),

    #[error("TLS configuration error: {0}")]
    Rustls(#[from] rustls::Error),
}

impl TlsError {
    #[must_use]
    pub fn ssl_not_configured(hostname: impl Into<String>) -> Self {
        Self::SslNotConfigured {
            hostname: hostname.into(),
        }
    }

    #[must_use]
    pub fn static_certificate_missing(domain: impl Into<String>) -> Self {
        Self::StaticCertificateMissing {
            domain: domain.into(),
        }
    }

    #[must_use]
    pub fn invalid_certificate(message: impl Into<String>) -> Self {
        Self::InvalidCertificate {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_private_key(message: impl Into<String>) -> Self {
        Self::InvalidPrivateKey {
            message: message.into(),
        }
    }
}

pub type TlsResult<T> = Result<T, TlsError>;
