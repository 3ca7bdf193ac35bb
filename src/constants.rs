use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;

/// Labels tried by the brute-force strategy, in output order.
pub const COMMON_SUBDOMAINS: &[&str] = &[
    "www", "mail", "api", "dev", "test", "staging", "admin", "portal", "blog", "shop", "beta",
    "secure", "cdn", "static", "app", "vpn",
];

/// Lower-case body fragments left behind by de-provisioned hosting services.
pub const TAKEOVER_SIGNATURES: &[&str] = &[
    "no such bucket",
    "there isn't a github pages site here",
    "no such app",
    "heroku | no such app",
];

pub const CRTSH_ENDPOINT: &str = "https://crt.sh";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

// crt.sh routinely takes longer than a single probe to build large responses
pub const CRTSH_TIMEOUT: Duration = Duration::from_secs(30);

pub const CRTSH_ATTEMPTS: usize = 3;

pub const CRTSH_BACKOFF: Duration = Duration::from_secs(2);

pub const TLS_PORT: u16 = 443;

pub const HTTP_PORT: u16 = 80;

pub const DEFAULT_CONCURRENCY: usize = 10;

pub static SUBDOMAIN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9\.]*[a-z0-9])?\.([a-z0-9-]+\.)*[a-z0-9]+$").unwrap());

pub static IP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$").unwrap());
