// src/sources/wayback.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use log::debug;
use std::num::NonZeroU32;
use std::sync::OnceLock;

/// archive.org throttles CDX queries per client address, so the budget is
/// shared by every finder in the process.
const REQUESTS_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(40) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

static LIMITER: OnceLock<DefaultDirectRateLimiter> = OnceLock::new();

fn limiter() -> &'static DefaultDirectRateLimiter {
    LIMITER.get_or_init(|| RateLimiter::direct(Quota::per_minute(REQUESTS_PER_MINUTE)))
}

/// Wayback Machine CDX index, one page at a time
#[derive(Debug, Clone)]
pub struct WaybackSource {
    name: String,
    base_url: String,
}

impl Default for WaybackSource {
    fn default() -> Self {
        Self::new()
    }
}

impl WaybackSource {
    pub fn new() -> Self {
        Self {
            name: "wayback".to_string(),
            base_url: "https://web.archive.org".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for WaybackSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let cancel = ctx.session.cancellation();
        let mut page: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FinderError::Cancelled),
                _ = limiter().until_ready() => {}
            }

            let url = format!(
                "{}/cdx/search/cdx?url=*.{}/*&output=json&collapse=urlkey&fl=original&page={}",
                self.base_url, domain, page
            );
            let rows: Vec<Vec<String>> = fetch_json(&self.name, &ctx.session, &url, &[]).await?;
            if rows.is_empty() {
                break;
            }

            // first row is the ["original"] header
            for row in rows.iter().skip(1) {
                for original in row {
                    results.matches(&ctx.extractor, original).await?;
                }
            }

            debug!("[{}] page {} done", self.name, page);
            page += 1;
        }

        Ok(())
    }
}
