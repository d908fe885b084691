// Findings sinks and the console summary

use crate::data::{Finding, Severity, VulnType};
use crate::error::{CoreError, Result};
use crate::scan::ScanSummary;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_REPORT_PATH: &str = "report.json";

/// Receives the final, deduplicated findings of a scan.
pub trait FindingsSink {
    fn write_findings(&self, findings: &[Finding]) -> Result<()>;
}

/// Writes findings as a pretty-printed JSON array, replacing any existing file.
#[derive(Debug, Clone)]
pub struct JsonReportWriter {
    path: PathBuf,
}

impl JsonReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for JsonReportWriter {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_PATH)
    }
}

impl FindingsSink for JsonReportWriter {
    fn write_findings(&self, findings: &[Finding]) -> Result<()> {
        let content = generate_json_report(findings)?;
        save_report(&content, &self.path).map_err(|source| CoreError::Report {
            path: self.path.clone(),
            source,
        })?;
        info!("Report written to {}", self.path.display());
        Ok(())
    }
}

pub fn generate_json_report(findings: &[Finding]) -> Result<String> {
    Ok(serde_json::to_string_pretty(findings)?)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Plain-text summary printed after a scan.
pub fn generate_scan_report(summary: &ScanSummary, findings: &[Finding]) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Pages crawled: {}\n", summary.pages_visited));
    report.push_str(&format!("  Forms scanned: {}\n", summary.forms_scanned));
    report.push_str(&format!("  Probes sent: {}\n", summary.probes_sent));
    report.push_str(&format!("  Findings: {}\n", findings.len()));
    for vuln_type in [VulnType::Xss, VulnType::Sqli, VulnType::Csrf] {
        report.push_str(&format!("    {:<5} {}\n", vuln_type, summary.count_of(vuln_type)));
    }
    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    if findings.is_empty() {
        report.push_str("No findings.\n");
        return report;
    }

    for (idx, finding) in findings.iter().enumerate() {
        let severity = match finding.severity {
            Severity::High => format!("\x1b[31m{}\x1b[0m", "HIGH"),
            Severity::Medium => format!("\x1b[33m{}\x1b[0m", "MEDIUM"),
            Severity::Low => format!("\x1b[37m{}\x1b[0m", "LOW"),
        };
        report.push_str(&format!(
            "[{}] {} {} on {}\n",
            idx + 1,
            severity,
            finding.vuln_type.as_str().to_uppercase(),
            finding.action
        ));
        report.push_str(&format!("  Page:     {}\n", finding.page));
        report.push_str(&format!("  Field:    {}\n", finding.field));
        report.push_str(&format!("  Payload:  {}\n", finding.payload));
        report.push_str(&format!("  Evidence: {}\n\n", finding.evidence));
    }

    report
}
