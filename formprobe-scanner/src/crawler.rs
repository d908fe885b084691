use crate::error::Result;
use crate::extract::{extract_page, PageModel, TokenKeywords};
use crate::http::{build_client, send_with_retry, HttpSettings};
use crate::model::PageRecord;
use crate::normalize::parse_base;
use crate::robots::RobotsCache;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Called with (pages started so far, url) whenever a fetch begins.
pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

pub const DEFAULT_POLITENESS: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Completed,
}

/// What a finished crawl session produced.
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    /// Pages that carried at least one form, in BFS order.
    pub pages: Vec<PageRecord>,
    /// Every successfully fetched URL, in BFS order.
    pub visited: Vec<String>,
}

enum Visit {
    Skipped,
    Failed,
    Fetched { url: Url, model: PageModel },
}

/// Per-session state. Dropped when the session ends, so a restart starts clean.
struct Session {
    claimed: Mutex<HashSet<String>>,
    started: AtomicUsize,
    budget: usize,
    next_slot: Mutex<Option<Instant>>,
}

impl Session {
    fn new(budget: usize) -> Self {
        Self {
            claimed: Mutex::new(HashSet::new()),
            started: AtomicUsize::new(0),
            budget,
            next_slot: Mutex::new(None),
        }
    }

    /// Check-and-insert in one critical section so a URL is fetched at most once.
    async fn claim(&self, url: &str) -> bool {
        self.claimed.lock().await.insert(url.to_string())
    }

    fn reserve_page(&self) -> Option<usize> {
        self.started
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < self.budget).then_some(n + 1))
            .ok()
            .map(|previous| previous + 1)
    }

    fn release_page(&self) {
        self.started.fetch_sub(1, Ordering::SeqCst);
    }

    fn pages_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Fetch start times are spaced at least `interval` apart, across all workers.
    async fn wait_politely(&self, interval: Duration) {
        if interval.is_zero() {
            return;
        }
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(previous) if previous > now => previous + interval,
                _ => now + interval,
            };
            *next = Some(slot);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

pub struct Crawler {
    client: Client,
    product_token: String,
    robots: Arc<RobotsCache>,
    keywords: TokenKeywords,
    politeness: Duration,
    workers: usize,
    retries: u32,
    progress_callback: Option<ProgressCallback>,
    state: StdMutex<SessionState>,
}

impl Crawler {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        let client = build_client(&settings)?;
        Ok(Self::with_client(client, &settings))
    }

    /// Reuse an existing client. `settings` only supplies the robots product token.
    pub fn with_client(client: Client, settings: &HttpSettings) -> Self {
        Self {
            client,
            product_token: settings.product_token(),
            robots: RobotsCache::shared(),
            keywords: TokenKeywords::default(),
            politeness: DEFAULT_POLITENESS,
            workers: 1,
            retries: 0,
            progress_callback: None,
            state: StdMutex::new(SessionState::Idle),
        }
    }

    pub fn with_politeness(mut self, interval: Duration) -> Self {
        self.politeness = interval;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_token_keywords(mut self, keywords: TokenKeywords) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_robots_cache(mut self, cache: Arc<RobotsCache>) -> Self {
        self.robots = cache;
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Breadth-first crawl from `start_url`, visiting at most `page_budget` pages.
    ///
    /// Only an unparseable start URL is an error. Individual page failures are
    /// logged and skipped.
    pub async fn crawl(&self, start_url: &str, page_budget: usize, bypass_robots: bool) -> Result<CrawlOutcome> {
        self.set_state(SessionState::Idle);
        let mut start = parse_base(start_url)?;
        start.set_fragment(None);
        self.set_state(SessionState::Running);

        info!(
            "Starting crawl of {} (budget {} pages, {} workers{})",
            start,
            page_budget,
            self.workers,
            if bypass_robots { ", ignoring robots.txt" } else { "" }
        );

        if !bypass_robots {
            self.robots.policy_for(&self.client, &start).await;
        }

        let session = Session::new(page_budget);
        let mut seen: HashSet<String> = HashSet::from([start.to_string()]);
        let mut frontier: VecDeque<Url> = VecDeque::from([start]);
        let mut outcome = CrawlOutcome::default();

        while !frontier.is_empty() && session.pages_started() < page_budget {
            // a whole layer is visited before anything it links to
            let layer: Vec<Url> = frontier.drain(..).collect();
            debug!("Visiting layer of {} URL(s)", layer.len());

            let mut visits = stream::iter(layer)
                .map(|url| self.visit(&session, url, bypass_robots))
                .buffered(self.workers);

            while let Some(visit) = visits.next().await {
                let Visit::Fetched { url, model } = visit else {
                    continue;
                };

                let mut links: Vec<String> = model.links.into_iter().collect();
                links.sort();
                for link in links {
                    if !seen.insert(link.clone()) {
                        continue;
                    }
                    match Url::parse(&link) {
                        Ok(next) => frontier.push_back(next),
                        Err(e) => debug!("Dropping unparseable link {}: {}", link, e),
                    }
                }

                if !model.forms.is_empty() {
                    outcome.pages.push(PageRecord {
                        page_url: url.to_string(),
                        forms: model.forms,
                    });
                }
                outcome.visited.push(url.to_string());
            }
        }

        self.set_state(SessionState::Completed);
        info!(
            "Crawl complete. Visited {} pages, {} with forms",
            outcome.visited.len(),
            outcome.pages.len()
        );
        Ok(outcome)
    }

    async fn visit(&self, session: &Session, url: Url, bypass_robots: bool) -> Visit {
        if !session.claim(url.as_str()).await {
            debug!("Already visited {}", url);
            return Visit::Skipped;
        }

        if !bypass_robots {
            let policy = self.robots.policy_for(&self.client, &url).await;
            if !policy.can_fetch(&self.product_token, &url) {
                warn!("Skipped by robots.txt: {}", url);
                return Visit::Skipped;
            }
        }

        let Some(started) = session.reserve_page() else {
            debug!("Page budget exhausted, not visiting {}", url);
            return Visit::Skipped;
        };

        if let Some(ref callback) = self.progress_callback {
            callback(started, url.to_string());
        }

        session.wait_politely(self.politeness).await;
        info!("Visiting: {}", url);

        match self.fetch(&url).await {
            Ok(body) => {
                let model = extract_page(&body, &url, &self.keywords);
                Visit::Fetched { url, model }
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", url, e);
                session.release_page();
                Visit::Failed
            }
        }
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = send_with_retry(self.client.get(url.as_str()), self.retries).await?;
        debug!("{} -> {}", url, response.status());
        Ok(response.text().await?)
    }
}
