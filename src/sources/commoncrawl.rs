// src/sources/commoncrawl.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use crate::utils::host_or_value;
use async_trait::async_trait;
use futures::future::join_all;
use log::debug;
use serde::Deserialize;

/// Newest crawl indexes queried per enumeration.
const MAX_INDEXES: usize = 5;

#[derive(Debug, Deserialize)]
struct IndexInfo {
    #[serde(default)]
    id: String,
    #[serde(rename = "cdx-api")]
    cdx_api: String,
}

#[derive(Debug, Deserialize)]
struct CdxLine {
    #[serde(default)]
    url: String,
}

/// Common Crawl CDX indexes, queried concurrently
#[derive(Debug, Clone)]
pub struct CommonCrawlSource {
    name: String,
    base_url: String,
}

impl Default for CommonCrawlSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CommonCrawlSource {
    pub fn new() -> Self {
        Self {
            name: "commoncrawl".to_string(),
            base_url: "https://index.commoncrawl.org".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn query_index(
        &self,
        index: &IndexInfo,
        domain: &str,
        ctx: &SourceContext,
        results: &ResultSender,
    ) -> Result<(), FinderError> {
        let url = format!("{}?url=*.{}&output=json", index.cdx_api, domain);
        let response = ctx.session.simple_get(&url).await?;

        // no captures for this crawl
        if response.status().as_u16() == 404 {
            return Ok(());
        }
        if !response.status().is_success() {
            return results
                .error(format!("{} returned {}", index.id, response.status()))
                .await;
        }

        let mut lines = ctx.session.lines(response);
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let Ok(record) = serde_json::from_str::<CdxLine>(&line) else {
                continue;
            };
            let host = host_or_value(&record.url);
            if ctx.extractor.in_scope(&host) {
                results.subdomain(host).await?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Source for CommonCrawlSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/collinfo.json", self.base_url);
        let indexes: Vec<IndexInfo> = fetch_json(&self.name, &ctx.session, &url, &[]).await?;

        let queries = indexes
            .iter()
            .take(MAX_INDEXES)
            .map(|index| self.query_index(index, domain, ctx, results));

        for outcome in join_all(queries).await {
            match outcome {
                Ok(()) => {}
                Err(FinderError::Cancelled) => return Err(FinderError::Cancelled),
                Err(e) => {
                    debug!("[{}] index query failed: {}", self.name, e);
                    results.error(e).await?;
                }
            }
        }

        Ok(())
    }
}
