// src/sources/intelx.rs
use crate::sources::{decode, ensure_success, fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use crate::utils::host_or_value;
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on result polls for one search job.
const MAX_POLLS: usize = 50;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    term: &'a str,
    maxresults: u32,
    media: u32,
    target: u32,
    timeout: u32,
}

#[derive(Debug, Deserialize)]
struct SearchJob {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    selectors: Vec<Selector>,
    #[serde(default)]
    status: i64,
}

#[derive(Debug, Deserialize)]
struct Selector {
    #[serde(default)]
    selectorvalue: String,
}

/// Intelligence X phonebook search. Credentials are `host:key`.
#[derive(Debug, Clone)]
pub struct IntelXSource {
    name: String,
    base_url: Option<String>,
    poll_interval: Duration,
}

impl Default for IntelXSource {
    fn default() -> Self {
        Self::new()
    }
}

impl IntelXSource {
    pub fn new() -> Self {
        Self {
            name: "intelx".to_string(),
            base_url: None,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Overrides the `https://<host>` part of the credential.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[async_trait]
impl Source for IntelXSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let Some(credential) = ctx.random_key(&self.name) else {
            debug!("[{}] skipped: no API key configured", self.name);
            return Ok(());
        };
        let Some((host, key)) = credential.rsplit_once(':') else {
            warn!("[{}] skipped: credential is not host:key", self.name);
            return Ok(());
        };
        let base = self.base_url.clone().unwrap_or_else(|| format!("https://{}", host));
        let key = urlencoding::encode(key);

        let search_url = format!("{}/phonebook/search?k={}", base, key);
        let body = serde_json::to_string(&SearchRequest {
            term: domain,
            maxresults: 100_000,
            media: 0,
            target: 1,
            timeout: 20,
        })
        .map_err(|e| FinderError::ParseError(e.to_string()))?;

        let response = ctx.session.simple_post(&search_url, "application/json", body).await?;
        let response = ensure_success(&self.name, &ctx.session, response).await?;
        let text = ctx.session.text(response).await?;
        let job: SearchJob = decode(&text)?;

        let results_url = format!("{}/phonebook/search/result?k={}&id={}&limit=10000", base, key, job.id);
        for poll in 0..MAX_POLLS {
            if poll > 0 {
                ctx.session.sleep(self.poll_interval).await?;
            }
            let page: SearchResults = fetch_json(&self.name, &ctx.session, &results_url, &[]).await?;

            for selector in &page.selectors {
                let host = host_or_value(&selector.selectorvalue);
                if !host.is_empty() {
                    results.subdomain(host).await?;
                }
            }

            // 0: more results pending, 3: nothing yet but the search is still running
            if page.status != 0 && page.status != 3 {
                return Ok(());
            }
            debug!("[{}] job {} still running (status {})", self.name, job.id, page.status);
        }

        Err(FinderError::SourceError {
            source_name: self.name.to_string(),
            message: format!("search {} still running after {} polls", job.id, MAX_POLLS),
        })
    }
}
