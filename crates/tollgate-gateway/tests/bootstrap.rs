use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::Engine;
use tollgate_cache::{CacheCriteria, DataSourceCache};
use tollgate_core::{
    Host, Library, ModelDataSource, Notification, Plan, ProxyEndpoint, ProxyEndpointType, SourceError,
    SourceResult,
};
use tollgate_gateway::config::loader::load_config;
use tollgate_gateway::{BootstrapError, GatewayCaches, GatewayConfig};

const PROXY_CERT: &str = include_str!("../../tollgate-tls/tests/fixtures/proxy.cert.pem");
const PROXY_KEY: &str = include_str!("../../tollgate-tls/tests/fixtures/proxy.key.pem");

#[derive(Default)]
struct Source {
    host_loads: AtomicUsize,
}

impl ModelDataSource for Source {
    fn find_proxy_endpoint_for_proxy(&self, id: i64, endpoint_type: ProxyEndpointType) -> SourceResult<ProxyEndpoint> {
        Ok(ProxyEndpoint {
            id,
            api_id: 1,
            endpoint_type,
            ..Default::default()
        })
    }

    fn all_libraries_for_api(&self, _api_id: i64) -> SourceResult<Vec<Library>> {
        Ok(Vec::new())
    }

    fn find_plan_by_account_id(&self, account_id: i64) -> SourceResult<Plan> {
        Err(SourceError::not_found("plan", account_id))
    }

    fn find_host_for_hostname(&self, hostname: &str) -> SourceResult<Host> {
        self.host_loads.fetch_add(1, Ordering::SeqCst);
        Ok(Host {
            id: 3,
            api_id: 1,
            hostname: hostname.to_string(),
            force_ssl: true,
            ..Default::default()
        })
    }
}

fn b64(pem: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(pem)
}

fn write_config(dir: &tempfile::TempDir, body: &str) -> String {
    let path = dir.path().join("tollgate.toml");
    fs::write(&path, body).expect("write toml");
    path.to_string_lossy().into_owned()
}

#[test]
fn config_file_builds_caching_layer() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = write_config(
        &dir,
        &format!(
            r#"
[cache]
size = 16

[proxy]
domain = "tollgate.test"
tls_port = 8443
tls_cert_content = "{}"
tls_key_content = "{}"

[admin]
host = "admin.tollgate.example"

[logging]
level = "debug"
"#,
            b64(PROXY_CERT),
            b64(PROXY_KEY)
        ),
    );

    let cfg = load_config(Some(path.as_str())).expect("should parse config");
    assert_eq!(cfg.cache.size, 16);
    assert_eq!(cfg.proxy.tls_port, 8443);

    let source = Arc::new(Source::default());
    let gateway = GatewayCaches::build(&cfg, source.clone()).expect("bootstrap");

    assert_eq!(gateway.registry().listener_count(), 2);
    assert!(gateway.standard_caches().is_some());
    assert!(gateway.certificates().certificate("shop.tollgate.test").is_ok());
    gateway.server_config().expect("server config");

    let redirect = gateway
        .redirects()
        .redirect_for("admin.tollgate.example", "/login")
        .expect("admin host redirects");
    assert_eq!(redirect.location, "https://admin.tollgate.example:8443/login");
    assert_eq!(redirect.status.code(), 301);

    gateway.caches().host(&CacheCriteria::from("shop.custom.com")).unwrap();
    gateway.caches().host(&CacheCriteria::from("shop.custom.com")).unwrap();
    assert_eq!(source.host_loads.load(Ordering::SeqCst), 1);
}

#[test]
fn zero_cache_size_passes_through() {
    let cfg = GatewayConfig::from_toml_str("dev_mode = true\n[cache]\nsize = 0\n").unwrap();
    let source = Arc::new(Source::default());
    let gateway = GatewayCaches::build(&cfg, source.clone()).expect("bootstrap");

    assert!(gateway.standard_caches().is_none());
    assert_eq!(gateway.registry().listener_count(), 1);

    let redirect = gateway.redirects().redirect_for("shop.custom.com", "/").unwrap();
    assert_eq!(redirect.status.code(), 307);
    gateway.caches().host(&CacheCriteria::from("shop.custom.com")).unwrap();
    assert_eq!(source.host_loads.load(Ordering::SeqCst), 2);
}

#[test]
fn static_certificate_without_domain_match_is_missing() {
    let cfg = GatewayConfig::from_toml_str("[proxy]\ndomain = \"tollgate.test\"\n").unwrap();
    let gateway = GatewayCaches::build(&cfg, Arc::new(Source::default())).unwrap();

    let err = gateway.certificates().certificate("x.tollgate.test").unwrap_err();
    assert_eq!(err.to_string(), "no certificate configured for tollgate.test");
}

#[test]
fn bad_certificate_content_fails_bootstrap() {
    let mut cfg = GatewayConfig::default();
    cfg.proxy.domain = "tollgate.test".into();
    cfg.proxy.tls_cert_content = "%%%".into();
    cfg.proxy.tls_key_content = b64(PROXY_KEY);

    let err = GatewayCaches::build(&cfg, Arc::new(Source::default())).unwrap_err();
    assert!(matches!(err, BootstrapError::Decode { field: "proxy.tls_cert_content", .. }));

    cfg.proxy.tls_cert_content = b64("not a certificate");
    let err = GatewayCaches::build(&cfg, Arc::new(Source::default())).unwrap_err();
    assert!(matches!(err, BootstrapError::Certificate { .. }));
}

#[tokio::test]
async fn dispatcher_invalidates_through_registry() {
    let cfg = GatewayConfig::default();
    let gateway = GatewayCaches::build(&cfg, Arc::new(Source::default())).unwrap();
    let standard = gateway.standard_caches().cloned().unwrap();

    gateway.caches().endpoint(&CacheCriteria::Id(5)).unwrap();
    gateway.caches().host(&CacheCriteria::from("shop.custom.com")).unwrap();
    assert_eq!(standard.endpoint_cache().len(), 1);

    let broadcaster = gateway.broadcaster();
    let handle = gateway.spawn_dispatcher(&broadcaster);
    broadcaster.publish(Notification::update("proxy_endpoints").with_api_id(1));
    drop(broadcaster);

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("dispatcher should stop when the feed closes")
        .unwrap();

    assert!(standard.endpoint_cache().is_empty());
    assert!(standard.host_cache().is_empty());
}
