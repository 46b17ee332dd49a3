// src/sources/builtwith.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BuiltWithResponse {
    #[serde(default)]
    results: Vec<BuiltWithResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BuiltWithResult {
    result: BuiltWithPaths,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BuiltWithPaths {
    #[serde(default)]
    paths: Vec<BuiltWithPath>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BuiltWithPath {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    sub_domain: String,
}

/// BuiltWith domain API
#[derive(Debug, Clone)]
pub struct BuiltWithSource {
    name: String,
    base_url: String,
}

impl Default for BuiltWithSource {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltWithSource {
    pub fn new() -> Self {
        Self {
            name: "builtwith".to_string(),
            base_url: "https://api.builtwith.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for BuiltWithSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let Some(api_key) = ctx.random_key(&self.name) else {
            debug!("[{}] skipped: no API key configured", self.name);
            return Ok(());
        };

        let url = format!(
            "{}/v21/api.json?KEY={}&HIDETEXT=yes&HIDEDL=yes&NOLIVE=yes&NOMETA=yes&NOPII=yes&NOATTR=yes&LOOKUP={}",
            self.base_url,
            urlencoding::encode(&api_key),
            domain
        );
        let response: BuiltWithResponse = fetch_json(&self.name, &ctx.session, &url, &[]).await?;

        for result in response.results {
            for path in result.result.paths {
                if path.domain.is_empty() {
                    continue;
                }
                let host = if path.sub_domain.is_empty() {
                    path.domain
                } else {
                    format!("{}.{}", path.sub_domain, path.domain)
                };
                results.subdomain(host).await?;
            }
        }

        Ok(())
    }
}
