//! Parsed certificates keyed by SNI server name.
//!
//! Two certificates are static: one for the proxy domain and one for the
//! admin host. Any server name containing either domain is answered from them
//! and they are never invalidated. Every other server name is a custom host
//! whose PEM material lives in the data source; it is parsed once on the first
//! handshake and kept until a `hosts` notification or a feed reconnect.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tollgate_cache::{CacheCriteria, DynCaches};
use tollgate_core::{Listener, Notification};
use tracing::{debug, info};

use crate::error::{TlsError, TlsResult};
use crate::parser::KeyPairParser;

const HOSTS_TABLE: &str = "hosts";

struct Parsed<C> {
    /// server name → certificate
    certs: HashMap<String, Arc<C>>,
    /// host id → server name
    host_names: HashMap<i64, String>,
    /// Bumped by every invalidation. A parse that started under an older
    /// epoch may hold stale material and is served without being cached.
    epoch: u64,
}

impl<C> Parsed<C> {
    fn invalidated(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }
}

impl<C> Default for Parsed<C> {
    fn default() -> Self {
        Self {
            certs: HashMap::new(),
            host_names: HashMap::new(),
            epoch: 0,
        }
    }
}

/// A statically configured certificate and the domain it answers for.
struct StaticCertificate<C> {
    domain: String,
    certificate: Option<Arc<C>>,
}

impl<C> StaticCertificate<C> {
    fn new(domain: String) -> Self {
        Self {
            domain,
            certificate: None,
        }
    }

    /// An empty domain matches nothing.
    fn matches(&self, server_name: &str) -> bool {
        !self.domain.is_empty() && server_name.contains(&self.domain)
    }

    fn get(&self) -> TlsResult<Arc<C>> {
        self.certificate
            .clone()
            .ok_or_else(|| TlsError::static_certificate_missing(&self.domain))
    }
}

pub struct CertificateCache<P: KeyPairParser> {
    caches: DynCaches,
    parser: P,
    proxy: StaticCertificate<P::Certificate>,
    admin: StaticCertificate<P::Certificate>,
    parsed: RwLock<Parsed<P::Certificate>>,
}

impl<P: KeyPairParser> CertificateCache<P> {
    pub fn new(
        caches: DynCaches,
        parser: P,
        proxy_domain: impl Into<String>,
        admin_domain: impl Into<String>,
    ) -> Self {
        Self {
            caches,
            parser,
            proxy: StaticCertificate::new(proxy_domain.into()),
            admin: StaticCertificate::new(admin_domain.into()),
            parsed: RwLock::new(Parsed::default()),
        }
    }

    #[must_use]
    pub fn with_proxy_certificate(mut self, certificate: P::Certificate) -> Self {
        self.proxy.certificate = Some(Arc::new(certificate));
        self
    }

    #[must_use]
    pub fn with_admin_certificate(mut self, certificate: P::Certificate) -> Self {
        self.admin.certificate = Some(Arc::new(certificate));
        self
    }

    /// Parse and seed the proxy-domain certificate.
    pub fn with_proxy_key_pair(self, cert_pem: &[u8], key_pem: &[u8]) -> TlsResult<Self> {
        let certificate = self.parser.parse(cert_pem, key_pem)?;
        Ok(self.with_proxy_certificate(certificate))
    }

    /// Parse and seed the admin-host certificate.
    pub fn with_admin_key_pair(self, cert_pem: &[u8], key_pem: &[u8]) -> TlsResult<Self> {
        let certificate = self.parser.parse(cert_pem, key_pem)?;
        Ok(self.with_admin_certificate(certificate))
    }

    pub fn proxy_domain(&self) -> &str {
        &self.proxy.domain
    }

    pub fn admin_domain(&self) -> &str {
        &self.admin.domain
    }

    /// Certificate to present for `server_name`.
    ///
    /// Custom hosts are parsed outside the lock. If another handshake cached
    /// the same name meanwhile, its certificate is returned and ours dropped.
    /// If a `hosts` notification or reconnect lands while we parse, the
    /// result is served to this handshake only and not cached.
    pub fn certificate(&self, server_name: &str) -> TlsResult<Arc<P::Certificate>> {
        if self.proxy.matches(server_name) {
            return self.proxy.get();
        }
        if self.admin.matches(server_name) {
            return self.admin.get();
        }

        let (cached, epoch) = {
            let parsed = self.parsed.read();
            (parsed.certs.get(server_name).cloned(), parsed.epoch)
        };
        if let Some(certificate) = cached {
            return Ok(certificate);
        }

        let host = self.caches.host(&CacheCriteria::from(server_name))?;
        if !host.has_tls_material() {
            return Err(TlsError::ssl_not_configured(&host.hostname));
        }

        let certificate = Arc::new(self.parser.parse(
            host.cert_contents.as_bytes(),
            host.private_key_contents.as_bytes(),
        )?);

        let mut parsed = self.parsed.write();
        if let Some(existing) = parsed.certs.get(server_name) {
            return Ok(Arc::clone(existing));
        }
        if parsed.epoch != epoch {
            debug!(server_name, host_id = host.id, "Host certificates invalidated during parse, not caching");
            return Ok(certificate);
        }
        parsed.certs.insert(server_name.to_string(), Arc::clone(&certificate));
        parsed.host_names.insert(host.id, server_name.to_string());
        debug!(server_name, host_id = host.id, "Cached parsed host certificate");

        Ok(certificate)
    }

    /// Whether a parsed custom-host certificate is cached for `server_name`.
    pub fn contains(&self, server_name: &str) -> bool {
        self.parsed.read().certs.contains_key(server_name)
    }

    /// Server name cached for a host id.
    pub fn server_name_for_host(&self, host_id: i64) -> Option<String> {
        self.parsed.read().host_names.get(&host_id).cloned()
    }

    /// Number of cached custom-host certificates.
    pub fn len(&self) -> usize {
        self.parsed.read().certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn forget_host(&self, host_id: i64) {
        let mut parsed = self.parsed.write();
        parsed.invalidated();
        if let Some(server_name) = parsed.host_names.remove(&host_id) {
            parsed.certs.remove(&server_name);
            debug!(host_id, server_name = %server_name, "Dropped cached host certificate");
        }
    }
}

impl<P: KeyPairParser> Listener for CertificateCache<P> {
    fn name(&self) -> &str {
        "certificate_cache"
    }

    fn notify(&self, notification: &Notification) {
        if notification.table == HOSTS_TABLE {
            self.forget_host(notification.entity_id);
        }
    }

    fn reconnect(&self) {
        let mut parsed = self.parsed.write();
        parsed.certs.clear();
        parsed.host_names.clear();
        parsed.invalidated();
        info!("Purged parsed host certificates after notification feed reconnect");
    }
}

impl<P: KeyPairParser> std::fmt::Debug for CertificateCache<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateCache")
            .field("proxy_domain", &self.proxy.domain)
            .field("admin_domain", &self.admin.domain)
            .field("proxy_certificate", &self.proxy.certificate.is_some())
            .field("admin_certificate", &self.admin.certificate.is_some())
            .field("cached", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use tollgate_cache::{CacheError, CacheResult, Caches};
    use tollgate_core::{Host, Library, Plan, ProxyEndpoint, SourceError};

    /// Parses "cert:key" strings into a label; rejects empty input.
    #[derive(Default)]
    struct LabelParser {
        calls: AtomicUsize,
    }

    impl KeyPairParser for LabelParser {
        type Certificate = String;

        fn parse(&self, cert_pem: &[u8], key_pem: &[u8]) -> TlsResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if cert_pem.is_empty() {
                return Err(TlsError::invalid_certificate("empty"));
            }
            Ok(format!(
                "{}:{}",
                String::from_utf8_lossy(cert_pem),
                String::from_utf8_lossy(key_pem)
            ))
        }
    }

    /// Waits on each gate in turn inside `parse`, then labels the result with
    /// the call number.
    struct GatedParser {
        gates: Vec<Arc<Barrier>>,
        calls: AtomicUsize,
    }

    impl GatedParser {
        fn new(gates: Vec<Arc<Barrier>>) -> Self {
            Self {
                gates,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl KeyPairParser for GatedParser {
        type Certificate = String;

        fn parse(&self, _cert_pem: &[u8], _key_pem: &[u8]) -> TlsResult<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            for gate in &self.gates {
                gate.wait();
            }
            Ok(format!("cert-{call}"))
        }
    }

    /// Hosts named `plain.*` have no TLS material; `missing.*` do not exist.
    #[derive(Default)]
    struct HostsOnly {
        lookups: AtomicUsize,
    }

    impl Caches for HostsOnly {
        fn endpoint(&self, _: &CacheCriteria) -> CacheResult<Arc<ProxyEndpoint>> {
            unreachable!()
        }

        fn libraries(&self, _: &CacheCriteria) -> CacheResult<Arc<Vec<Library>>> {
            unreachable!()
        }

        fn plan(&self, _: &CacheCriteria) -> CacheResult<Arc<Plan>> {
            unreachable!()
        }

        fn host(&self, criteria: &CacheCriteria) -> CacheResult<Arc<Host>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let hostname = criteria.as_hostname().unwrap_or_default();
            if hostname.starts_with("missing.") {
                return Err(CacheError::from(SourceError::not_found("host", hostname)));
            }
            let with_tls = !hostname.starts_with("plain.");
            Ok(Arc::new(Host {
                id: hostname.len() as i64,
                api_id: 1,
                hostname: hostname.to_string(),
                cert_contents: if with_tls { format!("cert-{hostname}") } else { String::new() },
                private_key_contents: if with_tls { "key".into() } else { String::new() },
                ..Default::default()
            }))
        }
    }

    fn cache() -> (CertificateCache<LabelParser>, Arc<HostsOnly>) {
        let hosts = Arc::new(HostsOnly::default());
        let cache = CertificateCache::new(hosts.clone(), LabelParser::default(), "tollgate.io", "admin.tollgate.io")
            .with_proxy_certificate("proxy".into())
            .with_admin_certificate("admin".into());
        (cache, hosts)
    }

    #[test]
    fn test_proxy_subdomain_uses_static_certificate() {
        let (cache, hosts) = cache();
        assert_eq!(*cache.certificate("shop.tollgate.io").unwrap(), "proxy");
        assert_eq!(*cache.certificate("tollgate.io").unwrap(), "proxy");
        assert_eq!(hosts.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_admin_domain_when_not_a_proxy_subdomain() {
        let hosts = Arc::new(HostsOnly::default());
        let cache = CertificateCache::new(hosts, LabelParser::default(), "proxy.example", "admin.example")
            .with_admin_certificate("admin".into());

        assert_eq!(*cache.certificate("admin.example").unwrap(), "admin");
        let err = cache.certificate("x.proxy.example").unwrap_err();
        assert!(matches!(err, TlsError::StaticCertificateMissing { domain } if domain == "proxy.example"));
    }

    #[test]
    fn test_empty_domain_never_matches() {
        let hosts = Arc::new(HostsOnly::default());
        let cache = CertificateCache::new(hosts.clone(), LabelParser::default(), "", "")
            .with_proxy_certificate("proxy".into());

        assert_eq!(*cache.certificate("api.custom.com").unwrap(), "cert-api.custom.com:key");
        assert_eq!(hosts.lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_custom_host_parsed_once() {
        let (cache, hosts) = cache();

        let first = cache.certificate("api.custom.com").unwrap();
        let second = cache.certificate("api.custom.com").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.parser.calls.load(Ordering::SeqCst), 1);
        assert_eq!(hosts.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(cache.server_name_for_host(14), Some("api.custom.com".into()));
    }

    #[test]
    fn test_host_without_material_is_not_cached() {
        let (cache, _) = cache();

        let err = cache.certificate("plain.custom.com").unwrap_err();
        assert!(matches!(err, TlsError::SslNotConfigured { hostname } if hostname == "plain.custom.com"));
        assert!(cache.is_empty());
        assert_eq!(cache.parser.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_lookup_failure() {
        let (cache, _) = cache();
        let err = cache.certificate("missing.custom.com").unwrap_err();
        assert!(matches!(err, TlsError::Lookup(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_hosts_notification_drops_only_that_host() {
        let (cache, _) = cache();
        cache.certificate("api.custom.com").unwrap();
        cache.certificate("www.custom.example").unwrap();

        cache.notify(&Notification::update("hosts").with_entity_id(14));
        cache.notify(&Notification::update("apis").with_entity_id(14));

        assert!(!cache.contains("api.custom.com"));
        assert!(cache.contains("www.custom.example"));
        assert_eq!(cache.server_name_for_host(14), None);
    }

    #[test]
    fn test_reconnect_keeps_statics() {
        let (cache, _) = cache();
        cache.certificate("api.custom.com").unwrap();

        cache.reconnect();
        cache.reconnect();

        assert!(cache.is_empty());
        assert_eq!(cache.server_name_for_host(14), None);
        assert_eq!(*cache.certificate("shop.tollgate.io").unwrap(), "proxy");
        assert_eq!(*cache.certificate("admin.tollgate.io").unwrap(), "proxy");
    }

    #[test]
    fn test_concurrent_misses_share_first_cached_certificate() {
        let gate = Arc::new(Barrier::new(2));
        let cache = CertificateCache::new(
            Arc::new(HostsOnly::default()),
            GatedParser::new(vec![gate]),
            "tollgate.io",
            "admin.tollgate.io",
        );

        let (first, second) = thread::scope(|s| {
            let a = s.spawn(|| cache.certificate("api.custom.com").unwrap());
            let b = s.spawn(|| cache.certificate("api.custom.com").unwrap());
            (a.join().unwrap(), b.join().unwrap())
        });

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.parser.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&cache.certificate("api.custom.com").unwrap(), &first));
    }

    #[test]
    fn test_notification_during_parse_is_not_overwritten() {
        let entered = Arc::new(Barrier::new(2));
        let released = Arc::new(Barrier::new(2));
        let cache = CertificateCache::new(
            Arc::new(HostsOnly::default()),
            GatedParser::new(vec![entered.clone(), released.clone()]),
            "tollgate.io",
            "admin.tollgate.io",
        );

        let served = thread::scope(|s| {
            let handshake = s.spawn(|| cache.certificate("api.custom.com").unwrap());
            entered.wait();
            cache.notify(&Notification::update("hosts").with_entity_id(14));
            released.wait();
            handshake.join().unwrap()
        });

        assert_eq!(*served, "cert-1");
        assert!(!cache.contains("api.custom.com"));
        assert_eq!(cache.server_name_for_host(14), None);
    }

    #[test]
    fn test_reconnect_during_parse_is_not_overwritten() {
        let entered = Arc::new(Barrier::new(2));
        let released = Arc::new(Barrier::new(2));
        let cache = CertificateCache::new(
            Arc::new(HostsOnly::default()),
            GatedParser::new(vec![entered.clone(), released.clone()]),
            "tollgate.io",
            "admin.tollgate.io",
        );

        thread::scope(|s| {
            let handshake = s.spawn(|| cache.certificate("api.custom.com").unwrap());
            entered.wait();
            cache.reconnect();
            released.wait();
            handshake.join().unwrap();
        });

        assert!(cache.is_empty());
    }
}
