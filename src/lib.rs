pub mod args;
pub mod config;
pub mod constants;
pub mod dns;
pub mod enumeration;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod reporting;
pub mod takeover;
pub mod tls;

pub use args::{Args, StrategyKind};
pub use config::EnumConfig;
pub use error::OsintError;
pub use model::{CertificateInfo, ResolvedTarget, SubdomainRecord, TargetSource};
pub use orchestrator::DomainEnumerator;

use std::sync::Arc;

use tracing::info;

use dns::{resolve_target, SystemResolver};
use enumeration::normalize_domain;
use reporting::{format_domain_report, format_ip_target, write_outputs};

/// Runs one domain enumeration and returns the rendered report.
///
/// The report is also written to `--output` / `--report-dir` when given.
pub async fn run(args: Args) -> Result<String, OsintError> {
    let config = Arc::new(EnumConfig::from(&args));
    let domain = normalize_domain(&args.domain);
    if domain.is_empty() {
        return Err(OsintError::InvalidDomain(args.domain));
    }

    info!("Starting enumeration for *.{}", domain);
    info!(
        strategy = ?config.strategy,
        concurrency = config.concurrency,
        timeout_secs = config.timeout.as_secs(),
        attempts = config.crtsh_attempts,
        "configuration"
    );

    let resolver = Arc::new(SystemResolver::from_system_conf(config.timeout));
    let target = resolve_target(&domain, resolver.as_ref()).await?;

    let (rendered, records) = if target.source == TargetSource::Ip {
        let rendered = if args.json {
            serde_json::to_string_pretty(&target)?
        } else {
            format_ip_target(&target)
        };
        (rendered, None)
    } else {
        info!("{} resolves to {}", domain, target.ip);

        let enumerator = DomainEnumerator::from_config(Arc::clone(&config), resolver)?;
        let records = enumerator.enumerate(&domain).await?;
        let rendered = if args.json {
            serde_json::to_string_pretty(&records)?
        } else {
            format_domain_report(&domain, &records)
        };
        (rendered, Some(records))
    };

    if let Some(path) = &args.output {
        std::fs::write(path, &rendered)?;
        info!("Results saved to {}", path.display());
    }
    if let (Some(dir), Some(records)) = (&args.report_dir, &records) {
        let out = write_outputs(records, dir, &domain)?;
        info!("Reports written to {}", out.display());
    }

    Ok(rendered)
}
