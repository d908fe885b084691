// Tests for response analysis

use formprobe_core::analysis::{
    check_missing_csrf, ResponseAnalyzer, SqlErrorSignatures, MISSING_CSRF_EVIDENCE,
    REFLECTION_EVIDENCE, SQL_ERROR_EVIDENCE,
};
use formprobe_core::data::{Severity, VulnType};
use formprobe_scanner::{FormDescriptor, FormInputDescriptor, FormMethod, ProbeOutcome};

const PAGE: &str = "http://testphp.vulnweb.com/search.php";

fn outcome(payload: &str, body: &str) -> ProbeOutcome {
    ProbeOutcome {
        action_url: "http://testphp.vulnweb.com/search.php?test=query".to_string(),
        method: FormMethod::Post,
        field: "searchFor".to_string(),
        payload: payload.to_string(),
        response_body: body.to_string(),
        status_code: 200,
    }
}

fn post_form(inputs: Vec<FormInputDescriptor>, has_csrf_token: bool) -> FormDescriptor {
    FormDescriptor {
        page_url: PAGE.to_string(),
        action_url: "http://testphp.vulnweb.com/login.php".to_string(),
        method: FormMethod::Post,
        inputs,
        has_csrf_token,
    }
}

// ============================================================================
// Reflection Tests
// ============================================================================

#[test]
fn test_reflected_payload_is_xss() {
    let payload = "<script>alert(1)</script>";
    let body = format!("<h2>searched for: {}</h2>", payload);

    let findings = ResponseAnalyzer::new().analyze(&outcome(payload, &body), PAGE);

    assert_eq!(findings.len(), 1);
    let finding = &findings[0];
    assert_eq!(finding.vuln_type, VulnType::Xss);
    assert_eq!(finding.evidence, REFLECTION_EVIDENCE);
    assert_eq!(finding.severity, Severity::Medium);
    assert_eq!(finding.page, PAGE);
    assert_eq!(finding.field, "searchFor");
    assert_eq!(finding.payload, payload);
}

#[test]
fn test_reflection_ignores_case() {
    let findings = ResponseAnalyzer::new().analyze(
        &outcome("<ScRiPt>alert(1)</sCrIpT>", "<SCRIPT>ALERT(1)</SCRIPT>"),
        PAGE,
    );
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].vuln_type, VulnType::Xss);
}

#[test]
fn test_encoded_payload_is_not_reflected() {
    let findings = ResponseAnalyzer::new().analyze(
        &outcome("<script>alert(1)</script>", "&lt;script&gt;alert(1)&lt;/script&gt;"),
        PAGE,
    );
    assert!(findings.is_empty());
}

// ============================================================================
// SQL Error Tests
// ============================================================================

#[test]
fn test_sql_error_string_is_sqli() {
    let body = "Warning: mysql_fetch_array() expects parameter 1 to be resource";
    let findings = ResponseAnalyzer::new().analyze(&outcome("'", body), PAGE);

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].vuln_type, VulnType::Sqli);
    assert_eq!(findings[0].evidence, SQL_ERROR_EVIDENCE);
}

#[test]
fn test_every_default_signature_matches() {
    let analyzer = ResponseAnalyzer::new();
    for body in [
        "You have an error in your SQL syntax; check the manual",
        "WARNING: MySQL something",
        "Unclosed quotation mark after the character string",
        "ORA-01756: quoted string not properly terminated",
    ] {
        let findings = analyzer.analyze(&outcome("1 OR 1=1", body), PAGE);
        assert_eq!(findings.len(), 1, "no match for {}", body);
        assert_eq!(findings[0].vuln_type, VulnType::Sqli);
    }
}

#[test]
fn test_reflection_and_sql_error_are_independent() {
    let payload = "' OR '1'='1";
    let body = format!("You have an error in your SQL syntax near '{}'", payload);
    let findings = ResponseAnalyzer::new().analyze(&outcome(payload, &body), PAGE);

    let types: Vec<VulnType> = findings.iter().map(|f| f.vuln_type).collect();
    assert_eq!(types, vec![VulnType::Xss, VulnType::Sqli]);
}

#[test]
fn test_clean_response_has_no_findings() {
    let findings = ResponseAnalyzer::new().analyze(&outcome("'", "<html>nothing here</html>"), PAGE);
    assert!(findings.is_empty());
}

#[test]
fn test_custom_signatures_replace_defaults() {
    let analyzer = ResponseAnalyzer::new()
        .with_sql_signatures(SqlErrorSignatures::new(["SQLSTATE["]));

    let pg = analyzer.analyze(&outcome("zzz", "SQLSTATE[42601]: Syntax error"), PAGE);
    assert_eq!(pg.len(), 1);
    assert_eq!(pg[0].vuln_type, VulnType::Sqli);

    let mysql = analyzer.analyze(&outcome("zzz", "You have an error in your SQL syntax"), PAGE);
    assert!(mysql.is_empty());
}

#[test]
fn test_signature_lookup_returns_matching_entry() {
    let signatures = SqlErrorSignatures::default();
    assert_eq!(signatures.signatures().len(), 4);
    assert_eq!(
        signatures.find_in("xx UNCLOSED QUOTATION MARK xx"),
        Some("unclosed quotation mark")
    );
    assert_eq!(signatures.find_in("fine"), None);
}

// ============================================================================
// CSRF Tests
// ============================================================================

#[test]
fn test_post_form_without_token_is_flagged() {
    let form = post_form(vec![FormInputDescriptor::new("uname", "text")], false);
    let finding = check_missing_csrf(&form).unwrap();

    assert_eq!(finding.vuln_type, VulnType::Csrf);
    assert_eq!(finding.field, "-");
    assert_eq!(finding.payload, "-");
    assert_eq!(finding.evidence, MISSING_CSRF_EVIDENCE);
    assert_eq!(finding.severity, Severity::Medium);
    assert_eq!(finding.page, PAGE);
    assert_eq!(finding.action, "http://testphp.vulnweb.com/login.php");
}

#[test]
fn test_post_form_with_token_is_not_flagged() {
    let form = post_form(
        vec![FormInputDescriptor::new("csrf_token", "hidden").with_value("x")],
        true,
    );
    assert!(check_missing_csrf(&form).is_none());
}

#[test]
fn test_get_form_is_never_flagged() {
    let mut form = post_form(vec![FormInputDescriptor::new("q", "text")], false);
    form.method = FormMethod::Get;
    assert!(check_missing_csrf(&form).is_none());
}
