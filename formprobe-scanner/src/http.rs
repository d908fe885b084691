use crate::error::Result;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = "formprobe/0.1 (+authorized security testing)";

/// Settings for the shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub max_redirects: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Some(Duration::from_secs(30)),
            max_redirects: 10,
        }
    }
}

impl HttpSettings {
    /// First product token of the user-agent, lower-cased. This is what robots.txt
    /// groups are matched against.
    pub fn product_token(&self) -> String {
        self.user_agent
            .split(|c: char| c == '/' || c.is_whitespace())
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

pub fn build_client(settings: &HttpSettings) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(settings.user_agent.clone())
        .pool_max_idle_per_host(50)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::limited(settings.max_redirects));

    if let Some(timeout) = settings.timeout {
        builder = builder.timeout(timeout).connect_timeout(timeout / 2);
    }

    Ok(builder.build()?)
}

const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// 500ms doubled per attempt, never more than 30s.
pub fn retry_backoff(attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(factor)).min(BACKOFF_CAP)
}

/// Send a request, retrying transport failures up to `retries` extra times with
/// exponential backoff starting at 500ms. HTTP error statuses are not retried.
pub async fn send_with_retry(request: RequestBuilder, retries: u32) -> Result<Response> {
    let mut attempt = 0;
    loop {
        let Some(this_try) = request.try_clone() else {
            // streaming bodies cannot be replayed
            return Ok(request.send().await?);
        };

        match this_try.send().await {
            Ok(response) => return Ok(response),
            Err(e) if attempt < retries && !e.is_builder() => {
                let backoff = retry_backoff(attempt);
                debug!("Transport error ({}), retrying in {:?}", e, backoff);
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
