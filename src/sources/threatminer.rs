// src/sources/threatminer.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ThreatMinerResponse {
    #[serde(default)]
    status_code: String,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    results: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ThreatMinerSource {
    name: String,
    base_url: String,
}

impl Default for ThreatMinerSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreatMinerSource {
    pub fn new() -> Self {
        Self {
            name: "threatminer".to_string(),
            base_url: "https://api.threatminer.org".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for ThreatMinerSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/v2/domain.php?q={}&rt=5", self.base_url, domain);
        let response: ThreatMinerResponse = fetch_json(&self.name, &ctx.session, &url, &[]).await?;

        // 404 is "no results", anything else but 200 is a remote error
        match response.status_code.as_str() {
            "200" | "" => {}
            "404" => return Ok(()),
            code => {
                return Err(FinderError::SourceError {
                    source_name: self.name.to_string(),
                    message: format!("status {}: {}", code, response.status_message),
                })
            }
        }

        for subdomain in response.results {
            results.subdomain(subdomain).await?;
        }

        Ok(())
    }
}
