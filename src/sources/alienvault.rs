// src/sources/alienvault.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PassiveDnsResponse {
    #[serde(default)]
    detail: String,
    #[serde(default)]
    error: String,
    #[serde(default)]
    passive_dns: Vec<PassiveDnsRecord>,
}

#[derive(Debug, Deserialize)]
struct PassiveDnsRecord {
    #[serde(default)]
    hostname: String,
}

/// AlienVault OTX passive DNS
#[derive(Debug, Clone)]
pub struct AlienVaultSource {
    name: String,
    base_url: String,
}

impl Default for AlienVaultSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AlienVaultSource {
    pub fn new() -> Self {
        Self {
            name: "alienvault".to_string(),
            base_url: "https://otx.alienvault.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for AlienVaultSource {
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

        let url = format!("{}/api/v1/indicators/domain/{}/passive_dns", self.base_url, domain);
        let response: PassiveDnsResponse =
            fetch_json(&self.name, &ctx.session, &url, &[("X-OTX-API-KEY", api_key.as_str())]).await?;

        if !response.error.is_empty() {
            return Err(FinderError::SourceError {
                source_name: self.name.to_string(),
                message: format!("{}: {}", response.detail, response.error),
            });
        }

        for record in &response.passive_dns {
            if !record.hostname.is_empty() {
                results.subdomain(record.hostname.as_str()).await?;
            }
        }

        Ok(())
    }
}
