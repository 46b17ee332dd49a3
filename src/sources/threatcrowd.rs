// src/sources/threatcrowd.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ThreatCrowdResponse {
    #[serde(default)]
    subdomains: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ThreatCrowdSource {
    name: String,
    base_url: String,
}

impl Default for ThreatCrowdSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreatCrowdSource {
    pub fn new() -> Self {
        Self {
            name: "threatcrowd".to_string(),
            base_url: "http://ci-www.threatcrowd.org".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for ThreatCrowdSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/searchApi/v2/domain/report/?domain={}", self.base_url, domain);
        let response: ThreatCrowdResponse = fetch_json(&self.name, &ctx.session, &url, &[]).await?;

        for subdomain in response.subdomains {
            results.subdomain(subdomain).await?;
        }

        Ok(())
    }
}
