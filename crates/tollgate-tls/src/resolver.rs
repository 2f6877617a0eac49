//! rustls integration.

use std::sync::Arc;

use rustls::ServerConfig;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use tracing::{debug, warn};

use crate::certs::CertificateCache;
use crate::error::TlsResult;
use crate::parser::PemKeyPairParser;

impl ResolvesServerCert for CertificateCache<PemKeyPairParser> {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let Some(server_name) = client_hello.server_name() else {
            debug!("Client hello without SNI, no certificate to offer");
            return None;
        };

        match self.certificate(server_name) {
            Ok(certificate) => Some(certificate),
            Err(e) => {
                warn!(server_name, error = %e, "Failed to resolve TLS certificate");
                None
            }
        }
    }
}

/// Server configuration that picks certificates per handshake from `resolver`.
pub fn server_config(resolver: Arc<CertificateCache<PemKeyPairParser>>) -> TlsResult<ServerConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_cert_resolver(resolver);
    Ok(config)
}
