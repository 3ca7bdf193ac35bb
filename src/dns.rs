use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, warn};
use trust_dns_resolver::{config::*, system_conf, TokioAsyncResolver};

use crate::error::OsintError;
use crate::model::{ResolvedTarget, TargetSource};

/// Forward lookup of a hostname to its first A record.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// `None` covers NXDOMAIN, resolver errors and timeouts alike.
    async fn lookup_ipv4(&self, host: &str) -> Option<IpAddr>;
}

pub struct SystemResolver {
    inner: TokioAsyncResolver,
    timeout: Duration,
}

impl SystemResolver {
    /// Uses the host's resolver configuration, one attempt per query.
    pub fn from_system_conf(lookup_timeout: Duration) -> Self {
        let (config, mut opts) = match system_conf::read_system_conf() {
            Ok(conf) => conf,
            Err(e) => {
                warn!("Could not read system resolver config ({}), using defaults", e);
                (ResolverConfig::default(), ResolverOpts::default())
            }
        };
        opts.timeout = lookup_timeout;
        opts.attempts = 1;

        Self {
            inner: TokioAsyncResolver::tokio(config, opts),
            timeout: lookup_timeout,
        }
    }
}

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup_ipv4(&self, host: &str) -> Option<IpAddr> {
        match timeout(self.timeout, self.inner.lookup_ip(host)).await {
            Ok(Ok(lookup)) => lookup.iter().find(IpAddr::is_ipv4),
            Ok(Err(e)) => {
                debug!(host, error = %e, "DNS lookup failed");
                None
            }
            Err(_) => {
                debug!(host, "DNS lookup timed out");
                None
            }
        }
    }
}

/// Turns a target string into an address.
///
/// Literal IPv4/IPv6 input is returned as-is. Anything else gets a single
/// DNS lookup; failure is an input error for the caller to report.
pub async fn resolve_target(
    target: &str,
    resolver: &dyn HostResolver,
) -> Result<ResolvedTarget, OsintError> {
    let target = target.trim();
    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ResolvedTarget {
            ip,
            source: TargetSource::Ip,
            domain: None,
        });
    }

    match resolver.lookup_ipv4(target).await {
        Some(ip) => Ok(ResolvedTarget {
            ip,
            source: TargetSource::Domain,
            domain: Some(target.to_string()),
        }),
        None => Err(OsintError::Unresolvable {
            target: target.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeResolver {
        answers: HashMap<String, IpAddr>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HostResolver for FakeResolver {
        async fn lookup_ipv4(&self, host: &str) -> Option<IpAddr> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers.get(host).copied()
        }
    }

    #[tokio::test]
    async fn literal_addresses_skip_dns() {
        let resolver = FakeResolver::default();
        for literal in ["192.168.1.1", "8.8.8.8", "::1", "2001:db8::1", "fe80::1:2:3:4"] {
            let resolved = resolve_target(literal, &resolver).await.unwrap();
            assert_eq!(resolved.source, TargetSource::Ip);
            assert_eq!(resolved.ip, literal.parse::<IpAddr>().unwrap());
            assert_eq!(resolved.domain, None);
        }
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn near_miss_addresses_go_to_dns() {
        let resolver = FakeResolver::default();
        for not_ip in ["256.1.1.1", "1.2.3", "1.2.3.4.5", "example.com", "::g"] {
            assert!(resolve_target(not_ip, &resolver).await.is_err());
        }
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn domain_resolves_with_source() {
        let mut resolver = FakeResolver::default();
        resolver
            .answers
            .insert("example.com".into(), "93.184.216.34".parse().unwrap());

        let resolved = resolve_target("example.com", &resolver).await.unwrap();
        assert_eq!(resolved.source, TargetSource::Domain);
        assert_eq!(resolved.ip.to_string(), "93.184.216.34");
        assert_eq!(resolved.domain.as_deref(), Some("example.com"));
    }

    #[tokio::test]
    async fn unresolvable_domain_is_single_line_error() {
        let resolver = FakeResolver::default();
        let err = resolve_target("nope.invalid", &resolver).await.unwrap_err();
        assert!(matches!(err, OsintError::Unresolvable { .. }));
        assert_eq!(err.to_string(), "Unable to resolve: nope.invalid");
    }
}
