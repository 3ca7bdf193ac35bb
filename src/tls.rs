use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::client::WebPkiServerVerifier;
use tokio_rustls::rustls::crypto::{ring, CryptoProvider};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    self, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme,
};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};
use x509_parser::objects::{oid2abbrev, oid_registry};
use x509_parser::prelude::{parse_x509_certificate, X509Name};

use crate::error::ProbeError;
use crate::model::CertificateInfo;

/// Fetches the certificate a host presents on its TLS port.
#[async_trait]
pub trait CertInspector: Send + Sync {
    /// `None` whenever no certificate could be obtained, for any reason.
    async fn inspect(&self, host: &str) -> Option<CertificateInfo>;
}

pub struct TlsInspector {
    roots: Arc<RootCertStore>,
    provider: Arc<CryptoProvider>,
    port: u16,
    timeout: Duration,
}

impl TlsInspector {
    pub fn new(port: u16, connect_timeout: Duration) -> Self {
        Self {
            roots: Arc::new(load_roots()),
            provider: Arc::new(ring::default_provider()),
            port,
            timeout: connect_timeout,
        }
    }

    async fn fetch(&self, host: &str) -> Result<CertificateInfo, ProbeError> {
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| ProbeError::ServerName(host.to_string()))?;

        let verifier = Arc::new(RecordingVerifier::new(
            Arc::clone(&self.roots),
            Arc::clone(&self.provider),
        )?);
        let config = ClientConfig::builder_with_provider(Arc::clone(&self.provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| ProbeError::Config(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(verifier.clone())
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));

        let stream = timeout(self.timeout, TcpStream::connect((host, self.port)))
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
            .map_err(ProbeError::Connect)?;

        let tls = timeout(self.timeout, connector.connect(server_name, stream))
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
            .map_err(ProbeError::Handshake)?;

        let (_, session) = tls.get_ref();
        let leaf = session
            .peer_certificates()
            .and_then(|certs| certs.first())
            .ok_or(ProbeError::NoCertificate)?;

        parse_certificate(leaf.as_ref(), verifier.trusted())
    }
}

#[async_trait]
impl CertInspector for TlsInspector {
    async fn inspect(&self, host: &str) -> Option<CertificateInfo> {
        match self.fetch(host).await {
            Ok(info) => Some(info),
            Err(e) => {
                debug!(host, error = %e, "no certificate information");
                None
            }
        }
    }
}

/// Platform trust store, or the bundled Mozilla roots when it yields nothing.
fn load_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        debug!(error = %e, "skipping unreadable native certificate source");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!(added, ignored, "loaded native trust roots");

    if roots.is_empty() {
        warn!("No usable system trust roots, falling back to bundled webpki roots");
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    roots
}

/// Runs normal webpki chain validation but only records the verdict, so an
/// untrusted or expired certificate can still be read.
#[derive(Debug)]
struct RecordingVerifier {
    inner: Arc<WebPkiServerVerifier>,
    trusted: AtomicBool,
}

impl RecordingVerifier {
    fn new(roots: Arc<RootCertStore>, provider: Arc<CryptoProvider>) -> Result<Self, ProbeError> {
        let inner = WebPkiServerVerifier::builder_with_provider(roots, provider)
            .build()
            .map_err(|e| ProbeError::Config(e.to_string()))?;
        Ok(Self {
            inner,
            trusted: AtomicBool::new(false),
        })
    }

    fn trusted(&self) -> bool {
        self.trusted.load(Ordering::Acquire)
    }
}

impl ServerCertVerifier for RecordingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let verdict = self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        );
        if let Err(e) = &verdict {
            debug!(error = %e, "certificate chain not trusted");
        }
        self.trusted.store(verdict.is_ok(), Ordering::Release);
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

fn parse_certificate(der: &[u8], verified: bool) -> Result<CertificateInfo, ProbeError> {
    let (_, cert) = parse_x509_certificate(der).map_err(|e| ProbeError::Parse(e.to_string()))?;
    let validity = cert.validity();

    Ok(CertificateInfo {
        issuer: name_to_map(cert.issuer()),
        subject: name_to_map(cert.subject()),
        not_before: format_cert_time(validity.not_before.timestamp()),
        not_after: format_cert_time(validity.not_after.timestamp()),
        verified,
    })
}

/// Flattens a distinguished name; repeated attributes keep the last value.
fn name_to_map(name: &X509Name<'_>) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for attr in name.iter_attributes() {
        let oid = attr.attr_type();
        let key = oid2abbrev(oid, oid_registry())
            .map(str::to_string)
            .unwrap_or_else(|_| oid.to_id_string());
        if let Ok(value) = attr.as_str() {
            map.insert(key, value.to_string());
        }
    }
    map
}

/// Formats a validity bound the way OpenSSL prints it, e.g.
/// `Jan  1 00:00:00 2025 GMT`.
pub(crate) fn format_cert_time(unix: i64) -> String {
    match DateTime::from_timestamp(unix, 0) {
        Some(dt) => dt.format("%b %e %H:%M:%S %Y GMT").to_string(),
        None => unix.to_string(),
    }
}
