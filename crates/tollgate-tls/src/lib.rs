//! # tollgate-tls
//!
//! Certificate selection for TLS handshakes and the plain-HTTP redirect
//! decision.
//!
//! [`CertificateCache`] answers SNI lookups from two static certificates (the
//! proxy domain and the admin host) and from per-host PEM material loaded
//! through the gateway's [`Caches`](tollgate_cache::Caches). It listens for
//! `hosts` notifications so a rotated certificate is picked up on the next
//! handshake.

pub mod certs;
pub mod error;
pub mod parser;
pub mod redirect;
pub mod resolver;

pub use certs::CertificateCache;
pub use error::{TlsError, TlsResult};
pub use parser::{KeyPairParser, PemKeyPairParser};
pub use redirect::{Redirect, RedirectPolicy, RedirectStatus};
pub use resolver::server_config;
