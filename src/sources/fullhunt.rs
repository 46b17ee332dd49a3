// src/sources/fullhunt.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FullHuntResponse {
    #[serde(default)]
    hosts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FullHuntSource {
    name: String,
    base_url: String,
}

impl Default for FullHuntSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FullHuntSource {
    pub fn new() -> Self {
        Self {
            name: "fullhunt".to_string(),
            base_url: "https://fullhunt.io".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for FullHuntSource {
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

        let url = format!("{}/api/v1/domain/{}/subdomains", self.base_url, domain);
        let response: FullHuntResponse =
            fetch_json(&self.name, &ctx.session, &url, &[("X-API-KEY", api_key.as_str())]).await?;

        for host in response.hosts {
            results.subdomain(host).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::{collect, context, errors, values};

    #[tokio::test]
    async fn test_hosts_with_api_key_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/domain/example.com/subdomains")
            .match_header("x-api-key", "fh-key")
            .with_body(r#"{"domain":"example.com","hosts":["a.example.com","b.example.com"]}"#)
            .create_async()
            .await;

        let source = FullHuntSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[("fullhunt", &["fh-key"])])).await;

        assert_eq!(values(&events), vec!["a.example.com", "b.example.com"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_key_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/domain/example.com/subdomains")
            .with_status(401)
            .with_body(r#"{"message":"Unauthorized"}"#)
            .create_async()
            .await;

        let source = FullHuntSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[("fullhunt", &["bad"])])).await;

        assert_eq!(errors(&events).len(), 1);
    }

    #[tokio::test]
    async fn test_without_key_emits_nothing() {
        let source = FullHuntSource::new().with_base_url("http://127.0.0.1:9");
        let events = collect(&source, context("example.com", &[])).await;

        assert!(events.is_empty());
    }
}
