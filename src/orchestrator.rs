use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::{redirect::Policy, Client};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::args::StrategyKind;
use crate::config::EnumConfig;
use crate::dns::HostResolver;
use crate::enumeration::{normalize_domain, BruteForceSource, CrtShSource, SubdomainSource};
use crate::error::OsintError;
use crate::model::SubdomainRecord;
use crate::takeover::{HttpTakeoverProbe, TakeoverProbe};
use crate::tls::{CertInspector, TlsInspector};

/// Discovers subdomains and enriches each one with DNS, certificate and
/// takeover data.
pub struct DomainEnumerator {
    source: Arc<dyn SubdomainSource>,
    resolver: Arc<dyn HostResolver>,
    inspector: Arc<dyn CertInspector>,
    takeover: Arc<dyn TakeoverProbe>,
    concurrency: usize,
}

impl DomainEnumerator {
    pub fn new(
        source: Arc<dyn SubdomainSource>,
        resolver: Arc<dyn HostResolver>,
        inspector: Arc<dyn CertInspector>,
        takeover: Arc<dyn TakeoverProbe>,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            resolver,
            inspector,
            takeover,
            concurrency: concurrency.max(1),
        }
    }

    /// Wires up the network-backed components selected by `config`.
    pub fn from_config(
        config: Arc<EnumConfig>,
        resolver: Arc<dyn HostResolver>,
    ) -> Result<Self, OsintError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::limited(5))
            .pool_idle_timeout(Some(std::time::Duration::from_secs(30)))
            .build()?;

        let source: Arc<dyn SubdomainSource> = match config.strategy {
            StrategyKind::Brute => Arc::new(BruteForceSource::new(
                Arc::clone(&resolver),
                Arc::clone(&config),
            )),
            StrategyKind::Crtsh => Arc::new(CrtShSource::new(client.clone(), Arc::clone(&config))),
        };
        let inspector = Arc::new(TlsInspector::new(config.tls_port, config.timeout));
        let takeover = Arc::new(HttpTakeoverProbe::new(
            client,
            config.takeover_signatures.clone(),
            config.http_port,
            config.timeout,
        ));

        Ok(Self::new(
            source,
            resolver,
            inspector,
            takeover,
            config.concurrency,
        ))
    }

    /// One record per discovered candidate, in discovery order.
    ///
    /// Probe failures only blank the affected fields; the only error is a
    /// domain that normalizes to nothing.
    pub async fn enumerate(&self, raw_domain: &str) -> Result<Vec<SubdomainRecord>, OsintError> {
        let domain = normalize_domain(raw_domain);
        if domain.is_empty() {
            return Err(OsintError::InvalidDomain(raw_domain.to_string()));
        }

        let candidates = self.source.discover(&domain).await;
        info!(
            "{} produced {} candidates for {}",
            self.source.name(),
            candidates.len(),
            domain
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = FuturesUnordered::new();

        for (index, candidate) in candidates.iter().enumerate() {
            let candidate = candidate.clone();
            let semaphore = Arc::clone(&semaphore);
            let resolver = Arc::clone(&self.resolver);
            let inspector = Arc::clone(&self.inspector);
            let takeover = Arc::clone(&self.takeover);

            tasks.push(async move {
                let handle = tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    probe_candidate(candidate, resolver, inspector, takeover).await
                });
                (index, handle.await)
            });
        }

        let mut slots: Vec<Option<SubdomainRecord>> = vec![None; candidates.len()];
        while let Some((index, res)) = tasks.next().await {
            match res {
                Ok(record) => slots[index] = Some(record),
                Err(e) => warn!("Probe task for {} failed: {}", candidates[index], e),
            }
        }

        let records: Vec<SubdomainRecord> = slots
            .into_iter()
            .zip(candidates)
            .map(|(slot, name)| slot.unwrap_or_else(|| SubdomainRecord::bare(name)))
            .collect();

        info!(
            "Enumeration of {} complete: {} records, {} possible takeovers",
            domain,
            records.len(),
            records.iter().filter(|r| r.possible_takeover).count()
        );
        Ok(records)
    }
}

async fn probe_candidate(
    subdomain: String,
    resolver: Arc<dyn HostResolver>,
    inspector: Arc<dyn CertInspector>,
    takeover: Arc<dyn TakeoverProbe>,
) -> SubdomainRecord {
    let (ip, ssl, possible_takeover) = tokio::join!(
        resolver.lookup_ipv4(&subdomain),
        inspector.inspect(&subdomain),
        takeover.possible_takeover(&subdomain),
    );
    debug!(
        %subdomain,
        ip = ?ip,
        has_cert = ssl.is_some(),
        possible_takeover,
        "probed candidate"
    );

    SubdomainRecord {
        subdomain,
        ip,
        ssl,
        possible_takeover,
    }
}
