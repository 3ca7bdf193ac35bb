use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use csv::Writer;
use itertools::Itertools;

use crate::error::OsintError;
use crate::model::{ResolvedTarget, SubdomainRecord};

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Human-readable block for one record.
///
/// Certificate lines are only emitted when a certificate was retrieved.
pub fn format_record(record: &SubdomainRecord) -> String {
    let mut out = format!(
        "Subdomain: {}\nIP: {}\nPossible Takeover: {}\n",
        record.subdomain,
        record
            .ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "Unknown".to_string()),
        yes_no(record.possible_takeover)
    );

    if let Some(cert) = &record.ssl {
        let field = |key: &str| cert.issuer_field(key).unwrap_or("Unknown").to_string();
        out.push_str(&format!(
            "SSL Issuer: {}\nSSL Issuer Country: {}\nSSL Issuer CN: {}\nSSL Expires: {}\n",
            field("O"),
            field("C"),
            field("CN"),
            cert.not_after
        ));
        if !cert.verified {
            out.push_str("SSL Trusted: No\n");
        }
    }
    out
}

pub fn format_domain_report(domain: &str, records: &[SubdomainRecord]) -> String {
    let mut out = format!("Domain enumeration: {}\n", domain);
    if records.is_empty() {
        out.push_str("No subdomains found.\n");
        return out;
    }

    out.push_str(&format!(
        "Found {} subdomains ({} possible takeovers)\n\n",
        records.len(),
        records.iter().filter(|r| r.possible_takeover).count()
    ));
    out.push_str(&records.iter().map(format_record).join("\n"));
    out
}

pub fn format_ip_target(target: &ResolvedTarget) -> String {
    format!(
        "IP Address: {}\nTarget is an address; subdomain enumeration needs a domain name.\n",
        target.ip
    )
}

/// Writes `<domain>_subdomains.txt`, `<domain>_report.json` and
/// `<domain>_report.csv` into a fresh timestamped folder under `base_dir`.
///
/// Returns the folder that was created.
pub fn write_outputs(
    records: &[SubdomainRecord],
    base_dir: &Path,
    domain: &str,
) -> Result<PathBuf, OsintError> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let output_dir = base_dir.join(format!("{}_{}", domain, timestamp));
    std::fs::create_dir_all(&output_dir)?;

    let mut file = File::create(output_dir.join(format!("{}_subdomains.txt", domain)))?;
    for record in records {
        writeln!(file, "{}", record.subdomain)?;
    }

    std::fs::write(
        output_dir.join(format!("{}_report.json", domain)),
        serde_json::to_string_pretty(records)?,
    )?;

    let mut wtr = Writer::from_path(output_dir.join(format!("{}_report.csv", domain)))?;
    wtr.write_record([
        "subdomain",
        "ip",
        "possible_takeover",
        "ssl_issuer_org",
        "ssl_issuer_country",
        "ssl_issuer_cn",
        "ssl_not_before",
        "ssl_not_after",
        "ssl_verified",
    ])?;

    for record in records {
        let ip = record.ip.map(|ip| ip.to_string()).unwrap_or_default();
        let cert = record.ssl.as_ref();
        let issuer = |key: &str| {
            cert.and_then(|c| c.issuer_field(key))
                .unwrap_or_default()
                .to_string()
        };
        wtr.write_record([
            record.subdomain.clone(),
            ip,
            record.possible_takeover.to_string(),
            issuer("O"),
            issuer("C"),
            issuer("CN"),
            cert.map(|c| c.not_before.clone()).unwrap_or_default(),
            cert.map(|c| c.not_after.clone()).unwrap_or_default(),
            cert.map(|c| c.verified.to_string()).unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;

    Ok(output_dir)
}
