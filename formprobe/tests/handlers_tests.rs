use formprobe::handlers::*;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_demo_target_is_always_authorized() {
    assert!(is_authorized_target("http://testphp.vulnweb.com/", false));
    assert!(is_authorized_target("http://testhtml5.vulnweb.com/#/popular", false));
}

#[test]
fn test_other_targets_need_confirmation() {
    assert!(!is_authorized_target("https://example.com/", false));
    assert!(is_authorized_target("https://example.com/", true));
}

#[test]
fn test_build_scan_options_maps_arguments() {
    let args = ScanArgs {
        url: "http://testphp.vulnweb.com/".to_string(),
        max_pages: 5,
        ignore_robots: true,
        threads: 0,
        delay_ms: 250,
        timeout_secs: 0,
        retries: 2,
        quiet: true,
        ..Default::default()
    };

    let options = build_scan_options(&args);
    assert_eq!(options.url, "http://testphp.vulnweb.com/");
    assert_eq!(options.max_pages, 5);
    assert!(options.ignore_robots);
    assert_eq!(options.workers, 1);
    assert_eq!(options.politeness, Duration::from_millis(250));
    assert_eq!(options.retries, 2);
    assert_eq!(options.http.timeout, None);
    assert!(!options.show_progress_bars);
}

#[test]
fn test_default_timeout_is_thirty_seconds() {
    let options = build_scan_options(&ScanArgs::default());
    assert_eq!(options.http.timeout, Some(Duration::from_secs(30)));
    assert_eq!(options.politeness, Duration::from_secs(1));
}

#[test]
fn test_load_payloads_bundled_and_from_dir() -> Result<(), Box<dyn std::error::Error>> {
    assert!(!load_payloads(None)?.is_empty());

    let dir = TempDir::new()?;
    fs::write(dir.path().join("xss.json"), r#"["<i>"]"#)?;
    fs::write(dir.path().join("sqli.json"), r#"["'"]"#)?;
    let loaded = load_payloads(dir.path().to_str())?;
    assert_eq!(loaded.payloads, vec!["<i>", "'"]);
    Ok(())
}

#[test]
fn test_load_payloads_rejects_empty_set() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("xss.json"), "[]").unwrap();
    fs::write(dir.path().join("sqli.json"), "[]").unwrap();
    assert!(load_payloads(dir.path().to_str()).is_err());
}

#[test]
fn test_expand_path_leaves_plain_paths_alone() {
    assert_eq!(expand_path("out/report.json").unwrap().to_str(), Some("out/report.json"));
}

#[tokio::test]
async fn test_unauthorized_target_sends_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let args = ScanArgs {
        url: mock_server.uri(),
        output: dir.path().join("report.json").to_string_lossy().into_owned(),
        quiet: true,
        ..Default::default()
    };

    let err = run_scan(&args).await.unwrap_err();
    assert!(err.to_string().contains("--i-understand"));
    assert!(!dir.path().join("report.json").exists());
}

#[tokio::test]
async fn test_confirmed_scan_writes_report() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(r#"<form method="post" action="/comment"><textarea name="body"></textarea></form>"#),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/comment"))
        .respond_with(ResponseTemplate::new(200).set_body_string("thanks"))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let report_path = dir.path().join("report.json");
    let args = ScanArgs {
        url: mock_server.uri(),
        i_understand: true,
        ignore_robots: true,
        delay_ms: 0,
        output: report_path.to_string_lossy().into_owned(),
        quiet: true,
        ..Default::default()
    };

    let (summary, written_to, report) = run_scan(&args).await.unwrap();
    assert_eq!(written_to, report_path);
    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.csrf_findings, 1);
    assert!(report.contains("Forms scanned: 1"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    let findings = json.as_array().unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0]["vuln_type"], "csrf");
    assert_eq!(findings[0]["evidence"], "Missing CSRF token");
}
