// Response heuristics: reflected payloads, SQL error strings and missing CSRF tokens

use crate::data::{Finding, VulnType};
use formprobe_scanner::{FormDescriptor, FormMethod, ProbeOutcome};
use tracing::info;

pub const REFLECTION_EVIDENCE: &str = "payload reflected in HTML";
pub const SQL_ERROR_EVIDENCE: &str = "SQL error string detected";
pub const MISSING_CSRF_EVIDENCE: &str = "Missing CSRF token";

/// Database error strings whose presence in a response suggests an injectable query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlErrorSignatures {
    signatures: Vec<String>,
}

impl SqlErrorSignatures {
    pub fn new<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            signatures: signatures
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// First signature found in `body`, compared case-insensitively.
    pub fn find_in(&self, body: &str) -> Option<&str> {
        let lowered = body.to_lowercase();
        self.signatures
            .iter()
            .find(|sig| lowered.contains(sig.as_str()))
            .map(String::as_str)
    }

    pub fn signatures(&self) -> &[String] {
        &self.signatures
    }
}

impl Default for SqlErrorSignatures {
    fn default() -> Self {
        // MySQL, MSSQL and Oracle
        Self::new([
            "you have an error in your sql syntax",
            "warning: mysql",
            "unclosed quotation mark",
            "quoted string not properly terminated",
        ])
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResponseAnalyzer {
    sql_signatures: SqlErrorSignatures,
}

impl ResponseAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sql_signatures(mut self, signatures: SqlErrorSignatures) -> Self {
        self.sql_signatures = signatures;
        self
    }

    /// Run every check against one probe response. The checks are independent,
    /// so one response can yield both an xss and an sqli finding.
    pub fn analyze(&self, outcome: &ProbeOutcome, page_url: &str) -> Vec<Finding> {
        let mut findings = Vec::new();
        findings.extend(self.check_reflection(outcome, page_url));
        findings.extend(self.check_sql_errors(outcome, page_url));
        findings
    }

    pub fn check_reflection(&self, outcome: &ProbeOutcome, page_url: &str) -> Option<Finding> {
        if outcome.payload.is_empty() {
            return None;
        }
        let reflected = outcome
            .response_body
            .to_lowercase()
            .contains(&outcome.payload.to_lowercase());
        if !reflected {
            return None;
        }

        info!(
            "[XSS] Payload reflected in response -> field: {} | payload: {}",
            outcome.field, outcome.payload
        );
        Some(Finding::new(
            page_url,
            &outcome.action_url,
            &outcome.field,
            &outcome.payload,
            VulnType::Xss,
            REFLECTION_EVIDENCE,
        ))
    }

    pub fn check_sql_errors(&self, outcome: &ProbeOutcome, page_url: &str) -> Option<Finding> {
        let signature = self.sql_signatures.find_in(&outcome.response_body)?;

        info!(
            "[SQLi] Error message '{}' detected -> field: {} | payload: {}",
            signature, outcome.field, outcome.payload
        );
        Some(Finding::new(
            page_url,
            &outcome.action_url,
            &outcome.field,
            &outcome.payload,
            VulnType::Sqli,
            SQL_ERROR_EVIDENCE,
        ))
    }
}

/// A POST form without a hidden token field is reported once, with `-` in place
/// of field and payload.
pub fn check_missing_csrf(form: &FormDescriptor) -> Option<Finding> {
    if form.method != FormMethod::Post || form.has_csrf_token {
        return None;
    }
    Some(Finding::new(
        &form.page_url,
        &form.action_url,
        "-",
        "-",
        VulnType::Csrf,
        MISSING_CSRF_EVIDENCE,
    ))
}
