// Page model extraction: same-origin links and attacker-usable form descriptors

use crate::model::{FormDescriptor, FormInputDescriptor, FormMethod};
use crate::normalize::{is_same_origin, normalize_reference};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href], area[href], link[href]").unwrap());
static FORM_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());
static CONTROL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input, textarea, select, button").unwrap());

/// Substrings that mark a field as carrying an anti-forgery or auth value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenKeywords {
    keywords: Vec<String>,
}

impl TokenKeywords {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for TokenKeywords {
    fn default() -> Self {
        Self::new(["csrf", "token", "auth", "verify", "nonce"])
    }
}

/// Everything the crawler and scanner need from one page.
#[derive(Debug, Clone, Default)]
pub struct PageModel {
    pub links: HashSet<String>,
    pub forms: Vec<FormDescriptor>,
}

/// Parse raw HTML and extract links and forms. Never fails; broken markup just
/// yields fewer elements.
pub fn extract_page(html: &str, page_url: &Url, keywords: &TokenKeywords) -> PageModel {
    let document = Html::parse_document(html);
    PageModel {
        links: extract_links(&document, page_url),
        forms: extract_forms(&document, page_url, keywords),
    }
}

pub fn extract_links(document: &Html, page_url: &Url) -> HashSet<String> {
    let mut links = HashSet::new();

    for element in document.select(&LINK_SELECTOR) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        match normalize_reference(page_url, href) {
            Some(absolute) if is_same_origin(&absolute, page_url) => {
                links.insert(absolute.to_string());
            }
            Some(absolute) => debug!("Ignoring cross-origin link {}", absolute),
            None => {}
        }
    }

    links
}

pub fn extract_forms(document: &Html, page_url: &Url, keywords: &TokenKeywords) -> Vec<FormDescriptor> {
    let forms: Vec<FormDescriptor> = document
        .select(&FORM_SELECTOR)
        .map(|form| describe_form(form, page_url, keywords))
        .collect();

    if !forms.is_empty() {
        debug!("Found {} form(s) on {}", forms.len(), page_url);
    }
    forms
}

fn describe_form(form: ElementRef<'_>, page_url: &Url, keywords: &TokenKeywords) -> FormDescriptor {
    let attrs = form.value();

    let action_url = attrs
        .attr("action")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .and_then(|a| page_url.join(a).ok())
        .unwrap_or_else(|| page_url.clone());

    let method = FormMethod::from_attr(attrs.attr("method"));

    let inputs: Vec<FormInputDescriptor> = form
        .select(&CONTROL_SELECTOR)
        .filter_map(|control| {
            let control = control.value();
            let name = control.attr("name").map(str::trim).filter(|n| !n.is_empty())?;
            let input_type = control
                .attr("type")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or("text");

            Some(FormInputDescriptor {
                name: name.to_string(),
                input_type: input_type.to_lowercase(),
                value: control.attr("value").map(str::to_string),
            })
        })
        .collect();

    let has_csrf_token = inputs.iter().any(|i| i.is_hidden() && keywords.matches(&i.name));

    FormDescriptor {
        page_url: page_url.to_string(),
        action_url: action_url.to_string(),
        method,
        inputs,
        has_csrf_token,
    }
}
