// src/sources/sublist3r.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct Sublist3rSource {
    name: String,
    base_url: String,
}

impl Default for Sublist3rSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Sublist3rSource {
    pub fn new() -> Self {
        Self {
            name: "sublist3r".to_string(),
            base_url: "https://api.sublist3r.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for Sublist3rSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/search.php?domain={}", self.base_url, domain);
        // the API answers `null` when it knows nothing
        let subdomains: Option<Vec<String>> = fetch_json(&self.name, &ctx.session, &url, &[]).await?;

        for subdomain in subdomains.unwrap_or_default() {
            results.subdomain(subdomain).await?;
        }

        Ok(())
    }
}
