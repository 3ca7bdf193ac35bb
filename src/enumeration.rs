use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::EnumConfig;
use crate::constants::{IP_REGEX, SUBDOMAIN_REGEX};
use crate::dns::HostResolver;

/// Produces candidate hostnames for a normalized base domain.
#[async_trait]
pub trait SubdomainSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn discover(&self, domain: &str) -> Vec<String>;
}

/// Delay used between certificate transparency attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        sleep(duration).await;
    }
}

/// Strips URL scheme, `www.` labels and any path from user input.
///
/// Idempotent: the loop runs until nothing more can be removed.
pub fn normalize_domain(raw: &str) -> String {
    let mut domain = raw.trim().to_ascii_lowercase();
    loop {
        let before = domain.len();
        for prefix in ["https://", "http://", "www."] {
            if let Some(rest) = domain.strip_prefix(prefix) {
                domain = rest.to_string();
            }
        }
        if let Some(slash) = domain.find('/') {
            domain.truncate(slash);
        }
        if domain.len() == before {
            return domain;
        }
    }
}

pub struct BruteForceSource {
    resolver: Arc<dyn HostResolver>,
    config: Arc<EnumConfig>,
}

impl BruteForceSource {
    pub fn new(resolver: Arc<dyn HostResolver>, config: Arc<EnumConfig>) -> Self {
        Self { resolver, config }
    }
}

#[async_trait]
impl SubdomainSource for BruteForceSource {
    fn name(&self) -> &'static str {
        "brute-force"
    }

    /// Returns `label.domain` for every wordlist label that resolves, in
    /// wordlist order.
    async fn discover(&self, domain: &str) -> Vec<String> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks = FuturesUnordered::new();

        for (index, label) in self.config.wordlist.iter().enumerate() {
            let candidate = format!("{}.{}", label, domain);
            let resolver = Arc::clone(&self.resolver);
            let semaphore = Arc::clone(&semaphore);

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                resolver
                    .lookup_ipv4(&candidate)
                    .await
                    .map(|_| (index, candidate))
            }));
        }

        let mut found = Vec::new();
        while let Some(res) = tasks.next().await {
            match res {
                Ok(Some(hit)) => found.push(hit),
                Ok(None) => {}
                Err(e) => warn!("Brute-force lookup task failed: {}", e),
            }
        }
        found.sort_unstable_by_key(|(index, _)| *index);

        let found: Vec<String> = found.into_iter().map(|(_, name)| name).collect();
        info!(
            "Brute force resolved {}/{} labels for {}",
            found.len(),
            self.config.wordlist.len(),
            domain
        );
        found
    }
}

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    name_value: String,
}

/// Result of one request against the CT aggregator.
enum Attempt {
    Done(Vec<String>),
    Retry(String),
    GiveUp(StatusCode),
}

pub struct CrtShSource {
    client: Client,
    config: Arc<EnumConfig>,
    sleeper: Arc<dyn Sleeper>,
}

impl CrtShSource {
    pub fn new(client: Client, config: Arc<EnumConfig>) -> Self {
        Self::with_sleeper(client, config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(client: Client, config: Arc<EnumConfig>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            client,
            config,
            sleeper,
        }
    }

    fn query_url(&self, domain: &str) -> String {
        format!(
            "{}/?q=%25.{}&output=json",
            self.config.crtsh_endpoint.trim_end_matches('/'),
            domain
        )
    }

    async fn attempt(&self, url: &str, domain: &str) -> Attempt {
        let resp = self
            .client
            .get(url)
            .header(header::USER_AGENT, self.config.user_agent.as_str())
            .header(header::ACCEPT, "application/json")
            .timeout(self.config.crtsh_timeout)
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => return Attempt::Retry(e.to_string()),
        };

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
            return Attempt::Retry(format!("rate limited ({})", status));
        }
        if !status.is_success() {
            return Attempt::GiveUp(status);
        }

        match resp.json::<Vec<CrtShEntry>>().await {
            Ok(entries) => Attempt::Done(extract_names(
                entries.iter().map(|e| e.name_value.as_str()),
                domain,
            )),
            Err(e) => Attempt::Retry(format!("bad response body: {}", e)),
        }
    }
}

#[async_trait]
impl SubdomainSource for CrtShSource {
    fn name(&self) -> &'static str {
        "crt.sh"
    }

    /// Never fails: throttling that outlasts the attempt budget, or any
    /// other non-2xx status, yields an empty list.
    async fn discover(&self, domain: &str) -> Vec<String> {
        let url = self.query_url(domain);
        let attempts = self.config.crtsh_attempts.max(1);

        for attempt in 1..=attempts {
            match self.attempt(&url, domain).await {
                Attempt::Done(subs) => {
                    info!("crt.sh found {} names for {}", subs.len(), domain);
                    return subs;
                }
                Attempt::GiveUp(status) => {
                    warn!("crt.sh returned {} for {}, no candidates", status, domain);
                    return Vec::new();
                }
                Attempt::Retry(reason) => {
                    warn!("crt.sh attempt {}/{} failed: {}", attempt, attempts, reason);
                    if attempt < attempts {
                        self.sleeper.sleep(self.config.crtsh_backoff).await;
                    }
                }
            }
        }

        warn!("crt.sh gave up on {} after {} attempts", domain, attempts);
        Vec::new()
    }
}

/// Pulls hostnames for `domain` out of crt.sh `name_value` fields.
///
/// Each field may hold several newline-separated names, wildcard-prefixed or
/// not. Output is deduplicated and sorted.
pub fn extract_names<'a, I>(name_values: I, domain: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let suffix = format!(".{}", domain);
    let mut subs = BTreeSet::new();

    for name in name_values.into_iter().flat_map(|v| v.split('\n')) {
        let trimmed = name.trim();
        let trimmed = trimmed.strip_prefix("*.").unwrap_or(trimmed);
        if trimmed.is_empty() {
            continue;
        }

        let ascii = match idna::domain_to_ascii(trimmed) {
            Ok(ascii) => ascii,
            Err(_) => {
                debug!(name = trimmed, "dropping name that fails IDNA mapping");
                continue;
            }
        };

        if ascii == domain {
            subs.insert(ascii);
            continue;
        }
        if IP_REGEX.is_match(&ascii) || !SUBDOMAIN_REGEX.is_match(&ascii) {
            continue;
        }
        if ascii.ends_with(&suffix) {
            subs.insert(ascii);
        }
    }

    subs.into_iter().collect()
}
