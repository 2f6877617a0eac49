//! Turning PEM key pairs into something a TLS stack can serve.

use rustls::crypto::ring::sign::any_supported_type;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;

use crate::error::{TlsError, TlsResult};

/// Parses a PEM certificate chain and private key.
pub trait KeyPairParser: Send + Sync {
    type Certificate: Send + Sync + 'static;

    fn parse(&self, cert_pem: &[u8], key_pem: &[u8]) -> TlsResult<Self::Certificate>;
}

/// Produces rustls [`CertifiedKey`]s signed with the ring provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct PemKeyPairParser;

impl KeyPairParser for PemKeyPairParser {
    type Certificate = CertifiedKey;

    fn parse(&self, cert_pem: &[u8], key_pem: &[u8]) -> TlsResult<CertifiedKey> {
        let chain = CertificateDer::pem_slice_iter(cert_pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TlsError::invalid_certificate(format!("{e:?}")))?;
        if chain.is_empty() {
            return Err(TlsError::invalid_certificate("no certificate found in PEM data"));
        }

        let key = PrivateKeyDer::from_pem_slice(key_pem)
            .map_err(|e| TlsError::invalid_private_key(format!("{e:?}")))?;
        let signing_key =
            any_supported_type(&key).map_err(|e| TlsError::invalid_private_key(e.to_string()))?;

        Ok(CertifiedKey::new(chain, signing_key))
    }
}
