use std::time::Duration;

use crate::args::{Args, StrategyKind};
use crate::constants::{
    COMMON_SUBDOMAINS, CRTSH_ATTEMPTS, CRTSH_BACKOFF, CRTSH_ENDPOINT, CRTSH_TIMEOUT,
    DEFAULT_CONCURRENCY, HTTP_PORT, PROBE_TIMEOUT, TAKEOVER_SIGNATURES, TLS_PORT, USER_AGENT,
};

/// Read-only settings shared by every enumeration component.
///
/// Built once per invocation and handed out behind an `Arc`; nothing mutates
/// it after construction.
#[derive(Debug, Clone)]
pub struct EnumConfig {
    pub strategy: StrategyKind,
    pub wordlist: Vec<String>,
    /// Stored lower-case; bodies are lower-cased before matching.
    pub takeover_signatures: Vec<String>,
    pub crtsh_endpoint: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub crtsh_timeout: Duration,
    pub crtsh_attempts: usize,
    pub crtsh_backoff: Duration,
    pub tls_port: u16,
    pub http_port: u16,
    pub concurrency: usize,
}

impl Default for EnumConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Brute,
            wordlist: COMMON_SUBDOMAINS.iter().map(|s| s.to_string()).collect(),
            takeover_signatures: TAKEOVER_SIGNATURES.iter().map(|s| s.to_string()).collect(),
            crtsh_endpoint: CRTSH_ENDPOINT.to_string(),
            user_agent: USER_AGENT.to_string(),
            timeout: PROBE_TIMEOUT,
            crtsh_timeout: CRTSH_TIMEOUT,
            crtsh_attempts: CRTSH_ATTEMPTS,
            crtsh_backoff: CRTSH_BACKOFF,
            tls_port: TLS_PORT,
            http_port: HTTP_PORT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl EnumConfig {
    pub fn with_signatures<I, S>(mut self, signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.takeover_signatures = signatures
            .into_iter()
            .map(|s| s.as_ref().to_lowercase())
            .collect();
        self
    }
}

impl From<&Args> for EnumConfig {
    fn from(args: &Args) -> Self {
        Self {
            strategy: args.strategy,
            crtsh_endpoint: args.crtsh_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(args.timeout.max(1)),
            crtsh_attempts: args.retries.max(1),
            concurrency: args.concurrency.max(1),
            ..Self::default()
        }
    }
}
