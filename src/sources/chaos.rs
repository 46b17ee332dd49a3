// src/sources/chaos.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use crate::utils::qualify;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ChaosResponse {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    subdomains: Vec<String>,
}

/// ProjectDiscovery Chaos dataset
#[derive(Debug, Clone)]
pub struct ChaosSource {
    name: String,
    base_url: String,
}

impl Default for ChaosSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ChaosSource {
    pub fn new() -> Self {
        Self {
            name: "chaos".to_string(),
            base_url: "https://dns.projectdiscovery.io".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for ChaosSource {
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

        let url = format!("{}/dns/{}/subdomains", self.base_url, domain);
        let response: ChaosResponse = fetch_json(
            &self.name,
            &ctx.session,
            &url,
            &[("Authorization", api_key.as_str()), ("Accept", "application/json")],
        )
        .await?;

        let apex = if response.domain.is_empty() { domain } else { response.domain.as_str() };
        for subdomain in &response.subdomains {
            results.subdomain(qualify(subdomain, apex)).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::{collect, context, values};

    #[tokio::test]
    async fn test_labels_are_joined_with_apex() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/dns/example.com/subdomains")
            .match_header("authorization", "secret")
            .with_body(r#"{"domain":"example.com","subdomains":["a","b"]}"#)
            .create_async()
            .await;

        let source = ChaosSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[("chaos", &["secret"])])).await;

        assert_eq!(values(&events), vec!["a.example.com", "b.example.com"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_without_key_emits_nothing() {
        let source = ChaosSource::new().with_base_url("http://127.0.0.1:9");
        let events = collect(&source, context("example.com", &[])).await;

        assert!(events.is_empty());
    }
}
