use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VulnType {
    Xss,
    Sqli,
    Csrf,
}

impl VulnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnType::Xss => "xss",
            VulnType::Sqli => "sqli",
            VulnType::Csrf => "csrf",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            VulnType::Sqli => Severity::High,
            VulnType::Xss | VulnType::Csrf => Severity::Medium,
        }
    }
}

impl fmt::Display for VulnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reportable issue. Serialized as-is into the JSON report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub page: String,
    pub action: String,
    pub field: String,
    pub payload: String,
    pub vuln_type: VulnType,
    pub evidence: String,
    pub severity: Severity,
}

impl Finding {
    /// Build a finding whose severity follows from its type.
    pub fn new(
        page: impl Into<String>,
        action: impl Into<String>,
        field: impl Into<String>,
        payload: impl Into<String>,
        vuln_type: VulnType,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            page: page.into(),
            action: action.into(),
            field: field.into(),
            payload: payload.into(),
            vuln_type,
            evidence: evidence.into(),
            severity: vuln_type.severity(),
        }
    }

    pub fn key(&self) -> FindingKey {
        FindingKey {
            page: self.page.clone(),
            action: self.action.clone(),
            field: self.field.clone(),
            payload: self.payload.clone(),
            vuln_type: self.vuln_type,
        }
    }
}

/// Identity of a finding. Evidence and severity are not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FindingKey {
    pub page: String,
    pub action: String,
    pub field: String,
    pub payload: String,
    pub vuln_type: VulnType,
}

#[derive(Default)]
struct StoreInner {
    seen: HashSet<FindingKey>,
    findings: Vec<Finding>,
}

/// Deduplicating, insertion-ordered collection of findings. Safe to share
/// between tasks; check and insert happen under one lock.
#[derive(Default)]
pub struct FindingStore {
    inner: Mutex<StoreInner>,
}

impl FindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an equal finding was already recorded.
    pub fn record(&self, finding: Finding) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !inner.seen.insert(finding.key()) {
            return false;
        }
        inner.findings.push(finding);
        true
    }

    pub fn snapshot(&self) -> Vec<Finding> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .findings
            .clone()
    }

    pub fn count_of(&self, vuln_type: VulnType) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .findings
            .iter()
            .filter(|f| f.vuln_type == vuln_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
