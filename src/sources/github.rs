// src/sources/github.rs
use crate::sources::{decode, ensure_success, ResultSender, Source, SourceContext};
use crate::tokens::{self, TokenManager};
use crate::types::FinderError;
use async_trait::async_trait;
use futures::future::join_all;
use log::debug;
use reqwest::header::{HeaderMap, LINK, RETRY_AFTER};
use serde::Deserialize;
use std::time::Duration;

/// Consecutive throttled responses tolerated before giving up.
const MAX_RATE_LIMIT_RETRIES: u32 = 10;

/// Retry-After fallback when the header is missing or unparsable.
const DEFAULT_RETRY_AFTER_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct GitHubSearchResponse {
    #[serde(default)]
    items: Vec<GitHubItem>,
}

#[derive(Debug, Deserialize)]
struct GitHubItem {
    html_url: String,
    #[serde(default)]
    text_matches: Vec<GitHubTextMatch>,
}

#[derive(Debug, Deserialize)]
struct GitHubTextMatch {
    #[serde(default)]
    fragment: String,
}

/// GitHub code search over every configured token
#[derive(Debug, Clone)]
pub struct GitHubSource {
    name: String,
    api_url: String,
}

impl Default for GitHubSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubSource {
    pub fn new() -> Self {
        Self {
            name: "github".to_string(),
            api_url: "https://api.github.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.api_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn search(
        &self,
        domain: &str,
        tokens: &TokenManager,
        ctx: &SourceContext,
        results: &ResultSender,
    ) -> Result<(), FinderError> {
        let query = format!("\"{}\"", domain);
        let mut url = format!(
            "{}/search/code?per_page=100&q={}&sort=created&order=asc",
            self.api_url,
            urlencoding::encode(&query)
        );
        let mut throttled = 0;

        loop {
            let token = tokens.get().ok_or_else(|| FinderError::SourceError {
                source_name: self.name.to_string(),
                message: "token pool is empty".to_string(),
            })?;

            let now = tokens::now();
            if token.is_exceeded(now) {
                debug!("[{}] every token is throttled, waiting {}s", self.name, token.wait_secs(now));
                ctx.session.sleep(Duration::from_secs(token.wait_secs(now))).await?;
            }

            let authorization = format!("token {}", token.hash);
            let response = ctx.session
                .get(
                    &url,
                    "",
                    &[
                        ("Accept", "application/vnd.github.v3.text-match+json"),
                        ("Authorization", authorization.as_str()),
                    ],
                )
                .await?;

            if response.status().as_u16() == 403 && rate_limit_exhausted(response.headers()) {
                throttled += 1;
                if throttled > MAX_RATE_LIMIT_RETRIES {
                    return Err(FinderError::RateLimitError(self.name.to_string()));
                }
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.trim().parse::<i64>().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                tokens.set_current_exceeded(retry_after);
                continue;
            }
            throttled = 0;

            let next = next_link(response.headers());
            let response = ensure_success(&self.name, &ctx.session, response).await?;
            let text = ctx.session.text(response).await?;
            let page: GitHubSearchResponse = decode(&text)?;

            self.process_items(&page.items, ctx, results).await?;

            match next {
                Some(next_url) => url = next_url,
                None => break,
            }
        }

        Ok(())
    }

    async fn process_items(
        &self,
        items: &[GitHubItem],
        ctx: &SourceContext,
        results: &ResultSender,
    ) -> Result<(), FinderError> {
        let downloads = items.iter().map(|item| async move {
            if !item.html_url.contains("/blob/") {
                return None;
            }
            let raw_url = raw_url(&item.html_url);
            match ctx.session.simple_get(&raw_url).await {
                Ok(response) if response.status().is_success() => ctx.session.text(response).await.ok(),
                Ok(response) => {
                    debug!("[{}] {} returned {}", self.name, raw_url, response.status());
                    None
                }
                Err(e) => {
                    debug!("[{}] could not fetch {}: {}", self.name, raw_url, e);
                    None
                }
            }
        });
        let contents = join_all(downloads).await;

        for (item, content) in items.iter().zip(contents) {
            if let Some(content) = content {
                for line in content.lines() {
                    results.matches(&ctx.extractor, line).await?;
                }
            }
            for text_match in &item.text_matches {
                results.matches(&ctx.extractor, &text_match.fragment).await?;
            }
        }

        Ok(())
    }
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|h| h.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false)
}

fn raw_url(html_url: &str) -> String {
    html_url
        .replace("https://github.com/", "https://raw.githubusercontent.com/")
        .replace("/blob/", "/")
}

/// `Link: <url>; rel="next"`, unescaped.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    let part = link.split(',').find(|part| part.contains("rel=\"next\""))?;
    let start = part.find('<')? + 1;
    let end = part.find('>')?;
    if end <= start {
        return None;
    }
    urlencoding::decode(&part[start..end]).ok().map(|s| s.into_owned())
}

#[async_trait]
impl Source for GitHubSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let pool = ctx.keys_for(&self.name);
        if pool.is_empty() {
            debug!("[{}] skipped: no API token configured", self.name);
            return Ok(());
        }

        let tokens = TokenManager::new(pool);
        self.search(domain, &tokens, ctx, results).await
    }
}
