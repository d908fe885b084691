// Tests for payload loading

use formprobe_core::error::CoreError;
use formprobe_core::payloads::{parse_payloads, PayloadSet, SQLI_FILE, XSS_FILE};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_payloads(dir: &Path, xss: &str, sqli: &str) {
    fs::write(dir.join(XSS_FILE), xss).unwrap();
    fs::write(dir.join(SQLI_FILE), sqli).unwrap();
}

#[test]
fn test_load_from_dir_concatenates_xss_first() {
    let dir = TempDir::new().unwrap();
    write_payloads(dir.path(), r#"["<x>", "<y>"]"#, r#"["'", "1 OR 1=1"]"#);

    let set = PayloadSet::load_from_dir(dir.path()).unwrap();
    assert_eq!(set.payloads, vec!["<x>", "<y>", "'", "1 OR 1=1"]);
    assert_eq!(set.len(), 4);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(XSS_FILE), r#"["<x>"]"#).unwrap();

    let err = PayloadSet::load_from_dir(dir.path()).unwrap_err();
    match err {
        CoreError::Payloads { path, .. } => assert!(path.ends_with(SQLI_FILE)),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    write_payloads(dir.path(), r#"{"not": "a list"}"#, r#"["'"]"#);

    let err = PayloadSet::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::PayloadFormat { .. }));
    assert!(err.to_string().contains(XSS_FILE));
}

#[test]
fn test_non_string_entries_are_rejected() {
    let result = parse_payloads("[1, 2, 3]", Path::new("numbers.json"));
    assert!(matches!(result, Err(CoreError::PayloadFormat { .. })));
}

#[test]
fn test_empty_strings_are_dropped() {
    let payloads = parse_payloads(r#"["", "<x>", ""]"#, Path::new("xss.json")).unwrap();
    assert_eq!(payloads, vec!["<x>"]);
}

#[test]
fn test_empty_lists_are_allowed() {
    let dir = TempDir::new().unwrap();
    write_payloads(dir.path(), "[]", "[]");

    let set = PayloadSet::load_from_dir(dir.path()).unwrap();
    assert!(set.is_empty());
}
