use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use osintmap::dns::{resolve_target, HostResolver};
use osintmap::enumeration::{BruteForceSource, CrtShSource, SubdomainSource};
use osintmap::reporting::format_domain_report;
use osintmap::takeover::TakeoverProbe;
use osintmap::tls::TlsInspector;
use osintmap::{DomainEnumerator, EnumConfig, OsintError};
use reqwest::Client;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Resolves only hosts on a fixed list, all to loopback.
struct LoopbackResolver(Vec<&'static str>);

#[async_trait]
impl HostResolver for LoopbackResolver {
    async fn lookup_ipv4(&self, host: &str) -> Option<IpAddr> {
        self.0
            .iter()
            .any(|h| *h == host)
            .then(|| IpAddr::from([127, 0, 0, 1]))
    }
}

struct NeverTakenOver;

#[async_trait]
impl TakeoverProbe for NeverTakenOver {
    async fn possible_takeover(&self, _host: &str) -> bool {
        false
    }
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn brute_force_pipeline_with_real_tls_probe() {
    let resolver: Arc<dyn HostResolver> = Arc::new(LoopbackResolver(vec![
        "www.example.test",
        "api.example.test",
        "example.test",
    ]));
    let config = Arc::new(EnumConfig::default());

    let enumerator = DomainEnumerator::new(
        Arc::new(BruteForceSource::new(Arc::clone(&resolver), Arc::clone(&config))),
        Arc::clone(&resolver),
        Arc::new(TlsInspector::new(closed_port(), Duration::from_secs(1))),
        Arc::new(NeverTakenOver),
        4,
    );

    let records = enumerator
        .enumerate("http://www.example.test/")
        .await
        .unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.subdomain.as_str()).collect();
    assert_eq!(names, ["www.example.test", "api.example.test"]);
    assert!(records.iter().all(|r| r.ip == Some(IpAddr::from([127, 0, 0, 1]))));
    assert!(records.iter().all(|r| r.ssl.is_none()));

    let report = format_domain_report("example.test", &records);
    assert!(report.contains("Found 2 subdomains"));
    assert!(!report.contains("SSL"));
}

#[tokio::test]
async fn crtsh_pipeline_keeps_sorted_ct_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name_value": "zeta.example.test\n*.alpha.example.test"},
            {"name_value": "mid.example.test\nother.test"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = Arc::new(EnumConfig {
        crtsh_endpoint: server.uri(),
        ..EnumConfig::default()
    });
    let enumerator = DomainEnumerator::new(
        Arc::new(CrtShSource::new(Client::new(), Arc::clone(&config))),
        Arc::new(LoopbackResolver(vec!["mid.example.test"])),
        Arc::new(TlsInspector::new(closed_port(), Duration::from_secs(1))),
        Arc::new(NeverTakenOver),
        2,
    );

    let records = enumerator.enumerate("example.test").await.unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.subdomain.as_str()).collect();
    assert_eq!(
        names,
        ["alpha.example.test", "mid.example.test", "zeta.example.test"]
    );
    assert_eq!(records[0].ip, None);
    assert_eq!(records[1].ip, Some(IpAddr::from([127, 0, 0, 1])));
}

#[tokio::test]
async fn crtsh_source_reports_its_name() {
    let source = CrtShSource::new(Client::new(), Arc::new(EnumConfig::default()));
    assert_eq!(source.name(), "crt.sh");
}

#[tokio::test]
async fn unresolvable_target_is_an_input_error() {
    let resolver = LoopbackResolver(Vec::new());
    let err = resolve_target("missing.example.test", &resolver)
        .await
        .unwrap_err();
    assert!(matches!(err, OsintError::Unresolvable { .. }));
    assert_eq!(err.to_string().lines().count(), 1);
}
