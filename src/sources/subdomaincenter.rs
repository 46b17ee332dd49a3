// src/sources/subdomaincenter.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct SubdomainCenterSource {
    name: String,
    base_url: String,
}

impl Default for SubdomainCenterSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SubdomainCenterSource {
    pub fn new() -> Self {
        Self {
            name: "subdomaincenter".to_string(),
            base_url: "https://api.subdomain.center".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for SubdomainCenterSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/?domain={}", self.base_url, domain);
        let subdomains: Vec<String> = fetch_json(&self.name, &ctx.session, &url, &[]).await?;

        for subdomain in subdomains {
            results.subdomain(subdomain).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::{collect, context, errors, values};
    use mockito::Matcher;

    #[tokio::test]
    async fn test_plain_array_of_hosts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("domain".into(), "example.com".into()))
            .with_body(r#"["api.example.com","vpn.example.com"]"#)
            .create_async()
            .await;

        let source = SubdomainCenterSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[])).await;

        assert_eq!(values(&events), vec!["api.example.com", "vpn.example.com"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unexpected_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_body(r#"{"error":"rate limited"}"#)
            .create_async()
            .await;

        let source = SubdomainCenterSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[])).await;

        assert_eq!(errors(&events).len(), 1);
        assert!(values(&events).is_empty());
    }
}
