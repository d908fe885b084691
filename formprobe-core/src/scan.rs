use crate::analysis::{check_missing_csrf, ResponseAnalyzer};
use crate::data::{Finding, FindingStore, VulnType};
use crate::error::Result;
use crate::payloads::PayloadSet;
use crate::report::FindingsSink;
use formprobe_scanner::http::build_client;
use formprobe_scanner::{
    Crawler, FormDescriptor, HttpSettings, Injector, PageRecord, ProgressCallback,
    TokenKeywords,
};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Options for configuring a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub url: String,
    pub max_pages: usize,
    pub ignore_robots: bool,
    /// Concurrent page fetches during the crawl, and concurrent payloads per form.
    pub workers: usize,
    pub politeness: Duration,
    pub retries: u32,
    pub http: HttpSettings,
    pub token_keywords: TokenKeywords,
    pub show_progress_bars: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_pages: 30,
            ignore_robots: false,
            workers: 1,
            politeness: formprobe_scanner::crawler::DEFAULT_POLITENESS,
            retries: 0,
            http: HttpSettings::default(),
            token_keywords: TokenKeywords::default(),
            show_progress_bars: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub pages_visited: usize,
    pub forms_scanned: usize,
    pub probes_sent: usize,
    pub xss_findings: usize,
    pub sqli_findings: usize,
    pub csrf_findings: usize,
}

impl ScanSummary {
    pub fn count_of(&self, vuln_type: VulnType) -> usize {
        match vuln_type {
            VulnType::Xss => self.xss_findings,
            VulnType::Sqli => self.sqli_findings,
            VulnType::Csrf => self.csrf_findings,
        }
    }

    pub fn total_findings(&self) -> usize {
        self.xss_findings + self.sqli_findings + self.csrf_findings
    }
}

/// Crawl, then probe every discovered form with every payload.
pub struct ScanOrchestrator {
    crawler: Crawler,
    injector: Injector,
    analyzer: ResponseAnalyzer,
    payload_concurrency: usize,
    progress: Option<ProgressBar>,
}

impl ScanOrchestrator {
    pub fn new(crawler: Crawler, injector: Injector) -> Self {
        Self {
            crawler,
            injector,
            analyzer: ResponseAnalyzer::default(),
            payload_concurrency: 1,
            progress: None,
        }
    }

    /// Build a crawler and injector sharing one HTTP client.
    pub fn from_options(options: &ScanOptions) -> Result<Self> {
        let client = build_client(&options.http)?;

        let crawler = Crawler::with_client(client.clone(), &options.http)
            .with_workers(options.workers)
            .with_politeness(options.politeness)
            .with_retries(options.retries)
            .with_token_keywords(options.token_keywords.clone());
        let injector = Injector::with_client(client)
            .with_retries(options.retries)
            .with_token_keywords(options.token_keywords.clone());

        Ok(Self::new(crawler, injector).with_payload_concurrency(options.workers))
    }

    pub fn with_analyzer(mut self, analyzer: ResponseAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_payload_concurrency(mut self, concurrency: usize) -> Self {
        self.payload_concurrency = concurrency.max(1);
        self
    }

    /// Spinner to keep updated while crawling and probing. The crawler's
    /// progress callback is wired to it as well.
    pub fn with_progress_bar(mut self, progress: ProgressBar) -> Self {
        let pb = progress.clone();
        let callback: ProgressCallback = Arc::new(move |started: usize, url: String| {
            pb.set_message(format!("Crawling... {} pages ({})", started, url));
            pb.tick();
        });
        self.crawler = self.crawler.with_progress_callback(callback);
        self.progress = Some(progress);
        self
    }

    /// Run a full scan. Findings are recorded in `store` and handed to `sink`
    /// once everything has been probed.
    pub async fn run(
        &self,
        start_url: &str,
        max_pages: usize,
        ignore_robots: bool,
        payloads: &PayloadSet,
        store: &FindingStore,
        sink: &dyn FindingsSink,
    ) -> Result<ScanSummary> {
        let crawl = self.crawler.crawl(start_url, max_pages, ignore_robots).await?;
        info!(
            "Crawl finished: {} pages visited, {} with forms",
            crawl.visited.len(),
            crawl.pages.len()
        );

        let (forms_scanned, probes_sent) = self.scan_pages(&crawl.pages, payloads, store).await;

        sink.write_findings(&store.snapshot())?;

        Ok(ScanSummary {
            pages_visited: crawl.visited.len(),
            forms_scanned,
            probes_sent,
            xss_findings: store.count_of(VulnType::Xss),
            sqli_findings: store.count_of(VulnType::Sqli),
            csrf_findings: store.count_of(VulnType::Csrf),
        })
    }

    /// Probe every form on the given pages. Returns (forms scanned, probes sent).
    pub async fn scan_pages(
        &self,
        pages: &[PageRecord],
        payloads: &PayloadSet,
        store: &FindingStore,
    ) -> (usize, usize) {
        let total_forms: usize = pages.iter().map(|p| p.forms.len()).sum();
        let mut probes_sent = 0;
        let mut forms_scanned = 0;

        for page in pages {
            for form in &page.forms {
                forms_scanned += 1;
                if let Some(ref pb) = self.progress {
                    pb.set_message(format!(
                        "Probing form {}/{} ({})",
                        forms_scanned, total_forms, form.action_url
                    ));
                }

                if let Some(finding) = check_missing_csrf(form) {
                    record_new(store, finding);
                }

                probes_sent += self.probe_form(page, form, payloads, store).await;
            }
        }

        (forms_scanned, probes_sent)
    }

    /// Send every payload into `form`, analyzing each payload's outcomes as they
    /// arrive in payload order. Returns the number of probes sent.
    async fn probe_form(
        &self,
        page: &PageRecord,
        form: &FormDescriptor,
        payloads: &PayloadSet,
        store: &FindingStore,
    ) -> usize {
        let mut probes_sent = 0;
        let mut results = stream::iter(payloads.iter())
            .map(|payload| self.injector.probe_form(form, payload))
            .buffered(self.payload_concurrency);

        while let Some(outcomes) = results.next().await {
            probes_sent += outcomes.len();
            for finding in outcomes.iter().flat_map(|outcome| self.analyzer.analyze(outcome, &page.page_url)) {
                record_new(store, finding);
            }
        }
        probes_sent
    }
}

fn record_new(store: &FindingStore, finding: Finding) {
    let description = format!("{} in '{}' on {}", finding.vuln_type, finding.field, finding.action);
    if !store.record(finding) {
        debug!("Duplicate finding ignored: {}", description);
    }
}

/// Execute a scan with the given options, showing a spinner if enabled.
/// Returns the summary and the recorded findings.
pub async fn execute_scan(
    options: ScanOptions,
    payloads: &PayloadSet,
    sink: &dyn FindingsSink,
) -> Result<(ScanSummary, Vec<Finding>)> {
    let progress_bar = if options.show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting scan...");
        Some(pb)
    } else {
        None
    };

    let mut orchestrator = ScanOrchestrator::from_options(&options)?;
    if let Some(ref pb) = progress_bar {
        orchestrator = orchestrator.with_progress_bar(pb.clone());
    }

    let store = FindingStore::new();
    let result = orchestrator
        .run(
            &options.url,
            options.max_pages,
            options.ignore_robots,
            payloads,
            &store,
            sink,
        )
        .await;

    if let Some(ref pb) = progress_bar {
        match result {
            Ok(ref summary) => pb.finish_with_message(format!(
                "Scan complete! {} pages, {} forms, {} findings",
                summary.pages_visited,
                summary.forms_scanned,
                summary.total_findings()
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    let summary = result?;
    Ok((summary, store.snapshot()))
}
