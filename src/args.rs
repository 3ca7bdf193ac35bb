use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::constants::{CRTSH_ATTEMPTS, CRTSH_ENDPOINT, DEFAULT_CONCURRENCY};

/// How candidate subdomains are discovered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    /// Resolve a built-in list of common labels
    Brute,
    /// Query the crt.sh certificate transparency aggregator
    Crtsh,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Domain OSINT: subdomains, certificates and takeover risks", long_about = None)]
pub struct Args {
    /// Target domain (or IP address) to enumerate
    #[arg(short, long)]
    pub domain: String,

    /// Subdomain discovery strategy
    #[arg(short, long, value_enum, default_value_t = StrategyKind::Brute)]
    pub strategy: StrategyKind,

    /// Maximum number of subdomains probed at once
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Per-operation timeout in seconds (DNS, TLS, HTTP)
    #[arg(short, long, default_value = "5")]
    pub timeout: u64,

    /// Total attempts against the certificate transparency log
    #[arg(short, long, default_value_t = CRTSH_ATTEMPTS)]
    pub retries: usize,

    /// Write the text report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write txt/json/csv reports into a timestamped folder under this directory
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Print the records as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Base URL of the certificate transparency aggregator
    #[arg(long, default_value = CRTSH_ENDPOINT)]
    pub crtsh_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_reference_behaviour() {
        let args = Args::try_parse_from(["osintmap", "-d", "example.com"]).expect("parse");
        assert_eq!(args.domain, "example.com");
        assert_eq!(args.strategy, StrategyKind::Brute);
        assert_eq!(args.timeout, 5);
        assert_eq!(args.retries, 3);
        assert!(!args.json);
        assert!(args.output.is_none());
    }

    #[test]
    fn parses_strategy_and_output() {
        let args = Args::try_parse_from([
            "osintmap", "-d", "example.com", "-s", "crtsh", "-o", "out.txt", "--json",
        ])
        .expect("parse");
        assert_eq!(args.strategy, StrategyKind::Crtsh);
        assert_eq!(args.output, Some(PathBuf::from("out.txt")));
        assert!(args.json);
    }

    #[test]
    fn domain_is_required() {
        assert!(Args::try_parse_from(["osintmap"]).is_err());
    }
}
