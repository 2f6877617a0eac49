//! Wiring the cache layer from configuration.

use std::sync::Arc;

use base64::Engine;
use tokio::task::JoinHandle;
use tollgate_cache::{DynCaches, PassThroughCaches, StandardCaches};
use tollgate_core::{DynDataSource, ListenerRegistry, NotificationBroadcaster};
use tollgate_tls::{CertificateCache, PemKeyPairParser, RedirectPolicy, TlsError};
use tracing::{info, warn};

use crate::config::{ConfigError, GatewayConfig};
use crate::observability;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{field} is not valid base64: {source}")]
    Decode {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("failed to load {domain} certificate: {source}")]
    Certificate {
        domain: String,
        #[source]
        source: TlsError,
    },

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// Everything the proxy needs to consult configuration: the caches, the SNI
/// certificate cache, the redirect policy and the registry that keeps them
/// fresh.
pub struct GatewayCaches {
    caches: DynCaches,
    standard: Option<Arc<StandardCaches>>,
    certificates: Arc<CertificateCache<PemKeyPairParser>>,
    redirects: RedirectPolicy,
    registry: Arc<ListenerRegistry>,
    buffer_size: usize,
}

impl GatewayCaches {
    /// Build the cache layer over `source`.
    ///
    /// A cache size of `0` selects [`PassThroughCaches`], which has nothing to
    /// invalidate and is therefore not registered as a listener. The
    /// certificate cache is always registered.
    ///
    /// When tracing was set up through [`crate::observability`], the
    /// configured `logging.level` is applied here.
    pub fn build(config: &GatewayConfig, source: DynDataSource) -> Result<Self, BootstrapError> {
        config.validate()?;
        observability::apply_logging_level(&config.logging.level);

        let registry = ListenerRegistry::new_shared();
        let standard = config
            .cache
            .capacity()
            .map(|capacity| StandardCaches::new_shared(Arc::clone(&source), capacity));
        let caches: DynCaches = match &standard {
            Some(standard) => {
                registry.register(standard.clone());
                standard.clone()
            }
            None => {
                warn!("cache.size is 0, configuration caching disabled");
                PassThroughCaches::new_shared(source)
            }
        };

        let mut certificates = CertificateCache::new(
            Arc::clone(&caches),
            PemKeyPairParser,
            config.proxy.domain.clone(),
            config.admin.host.clone(),
        );
        if let Some((cert, key)) = decode_key_pair(
            ("proxy.tls_cert_content", &config.proxy.tls_cert_content),
            ("proxy.tls_key_content", &config.proxy.tls_key_content),
        )? {
            certificates = certificates
                .with_proxy_key_pair(&cert, &key)
                .map_err(|source| BootstrapError::Certificate {
                    domain: config.proxy.domain.clone(),
                    source,
                })?;
        }
        if let Some((cert, key)) = decode_key_pair(
            ("admin.tls_cert_content", &config.admin.tls_cert_content),
            ("admin.tls_key_content", &config.admin.tls_key_content),
        )? {
            certificates = certificates
                .with_admin_key_pair(&cert, &key)
                .map_err(|source| BootstrapError::Certificate {
                    domain: config.admin.host.clone(),
                    source,
                })?;
        }
        let certificates = Arc::new(certificates);
        registry.register(certificates.clone());

        let redirects = RedirectPolicy::new(
            Arc::clone(&caches),
            config.admin.host.clone(),
            config.proxy.tls_port,
            config.dev_mode,
        );

        info!(
            cache_size = config.cache.size,
            listeners = registry.listener_count(),
            "Gateway caches ready"
        );

        Ok(Self {
            caches,
            standard,
            certificates,
            redirects,
            registry,
            buffer_size: config.notifications.buffer_size,
        })
    }

    pub fn caches(&self) -> &DynCaches {
        &self.caches
    }

    /// The caching implementation, when caching is enabled.
    pub fn standard_caches(&self) -> Option<&Arc<StandardCaches>> {
        self.standard.as_ref()
    }

    pub fn certificates(&self) -> &Arc<CertificateCache<PemKeyPairParser>> {
        &self.certificates
    }

    pub fn redirects(&self) -> &RedirectPolicy {
        &self.redirects
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    /// A broadcaster sized from configuration.
    pub fn broadcaster(&self) -> NotificationBroadcaster {
        NotificationBroadcaster::with_capacity(self.buffer_size)
    }

    /// Forward `broadcaster`'s feed to every registered listener.
    pub fn spawn_dispatcher(&self, broadcaster: &NotificationBroadcaster) -> JoinHandle<()> {
        self.registry.spawn_dispatcher(broadcaster.subscribe())
    }

    /// rustls server configuration resolving certificates from this layer.
    pub fn server_config(&self) -> Result<rustls::ServerConfig, BootstrapError> {
        Ok(tollgate_tls::server_config(Arc::clone(&self.certificates))?)
    }
}

impl std::fmt::Debug for GatewayCaches {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCaches")
            .field("caching", &self.standard.is_some())
            .field("certificates", &self.certificates)
            .field("redirects", &self.redirects)
            .field("registry", &self.registry)
            .finish()
    }
}

/// Decode a base64 certificate/key pair. Both empty means not configured.
fn decode_key_pair(
    cert: (&'static str, &str),
    key: (&'static str, &str),
) -> Result<Option<(Vec<u8>, Vec<u8>)>, BootstrapError> {
    if cert.1.is_empty() && key.1.is_empty() {
        return Ok(None);
    }
    Ok(Some((decode(cert)?, decode(key)?)))
}

fn decode((field, value): (&'static str, &str)) -> Result<Vec<u8>, BootstrapError> {
    base64::engine::general_purpose::STANDARD
        .decode(value.trim())
        .map_err(|source| BootstrapError::Decode { field, source })
}
