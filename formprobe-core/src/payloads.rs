// Attack payload lists: xss.json then sqli.json, each a JSON array of strings

use crate::error::{CoreError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const XSS_FILE: &str = "xss.json";
pub const SQLI_FILE: &str = "sqli.json";

const BUNDLED_XSS: &str = include_str!("../payloads/xss.json");
const BUNDLED_SQLI: &str = include_str!("../payloads/sqli.json");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSet {
    pub name: String,
    pub payloads: Vec<String>,
}

impl PayloadSet {
    /// Load `xss.json` and `sqli.json` from `dir`. Either file missing or
    /// malformed is an error.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let mut payloads = read_payload_file(&dir.join(XSS_FILE))?;
        payloads.extend(read_payload_file(&dir.join(SQLI_FILE))?);

        info!("Loaded {} payloads from {}", payloads.len(), dir.display());
        Ok(Self {
            name: dir.display().to_string(),
            payloads,
        })
    }

    /// The lists compiled into the binary.
    pub fn bundled() -> Result<Self> {
        let mut payloads = parse_payloads(BUNDLED_XSS, Path::new(XSS_FILE))?;
        payloads.extend(parse_payloads(BUNDLED_SQLI, Path::new(SQLI_FILE))?);
        Ok(Self {
            name: "bundled".to_string(),
            payloads,
        })
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.payloads.iter().map(String::as_str)
    }
}

fn read_payload_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|source| CoreError::Payloads {
        path: path.to_path_buf(),
        source,
    })?;
    parse_payloads(&content, path)
}

/// Parse one payload file. Empty strings would match every response, so they
/// are dropped.
pub fn parse_payloads(content: &str, path: &Path) -> Result<Vec<String>> {
    let raw: Vec<String> = serde_json::from_str(content).map_err(|source| CoreError::PayloadFormat {
        path: PathBuf::from(path),
        source,
    })?;

    let total = raw.len();
    let payloads: Vec<String> = raw.into_iter().filter(|p| !p.is_empty()).collect();
    if payloads.len() < total {
        warn!(
            "Ignoring {} empty payload(s) in {}",
            total - payloads.len(),
            path.display()
        );
    }
    Ok(payloads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_payloads_parse() {
        let set = PayloadSet::bundled().unwrap();
        assert!(!set.is_empty());
        // xss entries come first
        assert!(set.payloads[0].contains("<script>"));
        assert!(set.iter().any(|p| p.contains("OR")));
    }
}
