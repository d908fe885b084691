// Single-field-at-a-time payload injection into discovered forms

use crate::error::Result;
use crate::extract::TokenKeywords;
use crate::http::{build_client, send_with_retry, HttpSettings};
use crate::model::{FormDescriptor, FormMethod, ProbeOutcome};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use tracing::{debug, info, warn};

pub struct Injector {
    client: Client,
    keywords: TokenKeywords,
    concurrency: usize,
    retries: u32,
}

impl Injector {
    pub fn new(settings: HttpSettings) -> Result<Self> {
        Ok(Self::with_client(build_client(&settings)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            keywords: TokenKeywords::default(),
            concurrency: 1,
            retries: 0,
        }
    }

    pub fn with_token_keywords(mut self, keywords: TokenKeywords) -> Self {
        self.keywords = keywords;
        self
    }

    /// How many fields of one form may be in flight at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Fields that will actually receive the payload: every distinct name that
    /// does not look like a token.
    pub fn target_fields<'a>(&self, form: &'a FormDescriptor) -> Vec<&'a str> {
        form.field_names()
            .into_iter()
            .filter(|name| !self.keywords.matches(name))
            .collect()
    }

    /// Request parameters for one probe. Token fields keep their declared value,
    /// `field` gets the payload, everything else is blank.
    pub fn probe_parameters(&self, form: &FormDescriptor, field: &str, payload: &str) -> Vec<(String, String)> {
        form.field_names()
            .into_iter()
            .map(|name| {
                let value = if self.keywords.matches(name) {
                    declared_value(form, name)
                } else if name == field {
                    payload.to_string()
                } else {
                    String::new()
                };
                (name.to_string(), value)
            })
            .collect()
    }

    /// Value of the first token-looking field, mirrored into `X-CSRF-Token`.
    pub fn csrf_header_value(&self, form: &FormDescriptor) -> Option<String> {
        form.inputs
            .iter()
            .find(|input| self.keywords.matches(&input.name))
            .map(|input| input.value.clone().unwrap_or_default())
    }

    /// Send one request per target field. Fields whose request fails on the wire
    /// are logged and left out of the result.
    pub async fn probe_form(&self, form: &FormDescriptor, payload: &str) -> Vec<ProbeOutcome> {
        let fields = self.target_fields(form);
        if fields.is_empty() {
            debug!("No injectable fields in form {} -> {}", form.page_url, form.action_url);
            return Vec::new();
        }

        let results: Vec<Option<ProbeOutcome>> = stream::iter(fields)
            .map(|field| async move {
                match self.probe_field(form, field, payload).await {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        warn!("Request failed for field '{}' on {}: {}", field, form.action_url, e);
                        None
                    }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        results.into_iter().flatten().collect()
    }

    async fn probe_field(&self, form: &FormDescriptor, field: &str, payload: &str) -> Result<ProbeOutcome> {
        let params = self.probe_parameters(form, field, payload);

        let mut request = match form.method {
            FormMethod::Post => self.client.post(&form.action_url).form(&params),
            FormMethod::Get => self.client.get(&form.action_url).query(&params),
        };
        request = request.header("X-Requested-With", "XMLHttpRequest");
        if let Some(token) = self.csrf_header_value(form) {
            request = request.header("X-CSRF-Token", token);
        }

        let response = send_with_retry(request, self.retries).await?;
        let status_code = response.status().as_u16();
        let response_body = response.text().await?;

        info!("Injected into '{}' on {} -> Status {}", field, form.action_url, status_code);

        Ok(ProbeOutcome {
            action_url: form.action_url.clone(),
            method: form.method,
            field: field.to_string(),
            payload: payload.to_string(),
            response_body,
            status_code,
        })
    }
}

fn declared_value(form: &FormDescriptor, name: &str) -> String {
    form.inputs
        .iter()
        .find(|input| input.name == name)
        .and_then(|input| input.value.clone())
        .unwrap_or_default()
}
