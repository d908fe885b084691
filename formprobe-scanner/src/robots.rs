// robots.txt fetching, parsing and per-origin caching

use crate::normalize::origin_key;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Access {
    AllowAll,
    DisallowAll,
    Rules,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    allow: bool,
    pattern: String,
}

#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    rules: Vec<Rule>,
}

/// Parsed robots.txt for one origin.
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    access: Access,
    groups: Vec<Group>,
}

impl RobotsPolicy {
    pub fn allow_all() -> Self {
        Self {
            access: Access::AllowAll,
            groups: Vec::new(),
        }
    }

    pub fn disallow_all() -> Self {
        Self {
            access: Access::DisallowAll,
            groups: Vec::new(),
        }
    }

    pub fn parse(body: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut current = Group::default();
        let mut seen_rule = false;

        for line in body.lines() {
            let line = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            };
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // a user-agent line after rules opens a new group
                    if seen_rule {
                        groups.push(std::mem::take(&mut current));
                        seen_rule = false;
                    }
                    current.agents.push(value.to_lowercase());
                }
                "allow" | "disallow" => {
                    if current.agents.is_empty() {
                        continue;
                    }
                    seen_rule = true;
                    if !value.is_empty() {
                        current.rules.push(Rule {
                            allow: key == "allow",
                            pattern: value.to_string(),
                        });
                    }
                }
                _ => {}
            }
        }

        if !current.agents.is_empty() {
            groups.push(current);
        }

        Self {
            access: Access::Rules,
            groups,
        }
    }

    /// `product_token` is the lower-cased first token of our user-agent, e.g. `formprobe`.
    pub fn can_fetch(&self, product_token: &str, url: &Url) -> bool {
        match self.access {
            Access::AllowAll => return true,
            Access::DisallowAll => return false,
            Access::Rules => {}
        }

        let token = product_token.to_lowercase();
        let specific: Vec<&Group> = self
            .groups
            .iter()
            .filter(|g| g.agents.iter().any(|a| a != "*" && !a.is_empty() && token.contains(a.as_str())))
            .collect();
        let applicable = if specific.is_empty() {
            self.groups
                .iter()
                .filter(|g| g.agents.iter().any(|a| a == "*"))
                .collect()
        } else {
            specific
        };

        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        // longest pattern wins, allow wins ties
        let mut best: Option<&Rule> = None;
        for rule in applicable.iter().flat_map(|g| g.rules.iter()) {
            if !pattern_matches(&rule.pattern, &target) {
                continue;
            }
            best = match best {
                Some(current)
                    if current.pattern.len() > rule.pattern.len()
                        || (current.pattern.len() == rule.pattern.len() && current.allow) =>
                {
                    Some(current)
                }
                _ => Some(rule),
            };
        }

        best.map(|r| r.allow).unwrap_or(true)
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };

    let parts: Vec<&str> = pattern.split('*').collect();
    if !path.starts_with(parts[0]) {
        return false;
    }
    let mut pos = parts[0].len();

    for (i, part) in parts.iter().enumerate().skip(1) {
        if anchored && i == parts.len() - 1 {
            return path.len() - pos >= part.len() && path.ends_with(part);
        }
        match path[pos..].find(part) {
            Some(idx) => pos += idx + part.len(),
            None => return false,
        }
    }

    !anchored || pos == path.len()
}

static SHARED: LazyLock<Arc<RobotsCache>> = LazyLock::new(|| Arc::new(RobotsCache::new()));

/// Per-origin robots.txt cache. Each origin is fetched at most once, even when
/// several tasks ask for it at the same moment.
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<RobotsPolicy>>>>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn shared() -> Arc<RobotsCache> {
        SHARED.clone()
    }

    pub async fn policy_for(&self, client: &Client, url: &Url) -> Arc<RobotsPolicy> {
        let key = origin_key(url);
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.entry(key.clone()).or_default().clone()
        };

        cell.get_or_init(|| async { Arc::new(fetch_policy(client, &key).await) })
            .await
            .clone()
    }

    pub fn cached(&self, url: &Url) -> Option<Arc<RobotsPolicy>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&origin_key(url)).and_then(|cell| cell.get().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn fetch_policy(client: &Client, origin: &str) -> RobotsPolicy {
    let robots_url = format!("{}/robots.txt", origin);
    debug!("Fetching {}", robots_url);

    let response = match client.get(&robots_url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Could not fetch {} ({}), allowing all", robots_url, e);
            return RobotsPolicy::allow_all();
        }
    };

    let status = response.status();
    if status.is_success() {
        match response.text().await {
            Ok(body) => {
                info!("Loaded robots.txt for {}", origin);
                RobotsPolicy::parse(&body)
            }
            Err(e) => {
                warn!("Failed to read {} ({}), allowing all", robots_url, e);
                RobotsPolicy::allow_all()
            }
        }
    } else if status.as_u16() == 401 || status.as_u16() == 403 {
        info!("robots.txt for {} is access-restricted ({}), disallowing all", origin, status);
        RobotsPolicy::disallow_all()
    } else if status.is_client_error() {
        debug!("No robots.txt for {} ({})", origin, status);
        RobotsPolicy::allow_all()
    } else if status.is_server_error() {
        warn!("robots.txt for {} returned {}, disallowing all", origin, status);
        RobotsPolicy::disallow_all()
    } else {
        RobotsPolicy::allow_all()
    }
}
