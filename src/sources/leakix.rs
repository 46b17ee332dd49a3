// src/sources/leakix.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LeakIxSubdomain {
    #[serde(default)]
    subdomain: String,
}

/// LeakIX subdomain endpoint; the key only lifts rate limits
#[derive(Debug, Clone)]
pub struct LeakIxSource {
    name: String,
    base_url: String,
}

impl Default for LeakIxSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LeakIxSource {
    pub fn new() -> Self {
        Self {
            name: "leakix".to_string(),
            base_url: "https://leakix.net".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for LeakIxSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/api/subdomains/{}", self.base_url, domain);
        let api_key = ctx.random_key(&self.name);

        let mut headers = vec![("accept", "application/json")];
        if let Some(key) = api_key.as_deref() {
            headers.push(("api-key", key));
        }

        let records: Vec<LeakIxSubdomain> = fetch_json(&self.name, &ctx.session, &url, &headers).await?;
        for record in records {
            results.subdomain(record.subdomain).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::{collect, context, values};

    #[tokio::test]
    async fn test_works_without_key() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/subdomains/example.com")
            .with_body(r#"[{"subdomain":"vpn.example.com","distinct_ips":1}]"#)
            .create_async()
            .await;

        let source = LeakIxSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[])).await;

        assert_eq!(values(&events), vec!["vpn.example.com"]);
    }
}
