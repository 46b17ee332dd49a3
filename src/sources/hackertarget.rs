// src/sources/hackertarget.rs
use crate::sources::{fetch_lines, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;

/// HackerTarget API source
#[derive(Debug, Clone)]
pub struct HackerTargetSource {
    name: String,
    base_url: String,
}

impl Default for HackerTargetSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HackerTargetSource {
    pub fn new() -> Self {
        Self {
            name: "hackertarget".to_string(),
            base_url: "https://api.hackertarget.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for HackerTargetSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/hostsearch/?q={}", self.base_url, domain);
        let mut lines = fetch_lines(&self.name, &ctx.session, &url).await?;

        // "host,ip" per line; failures arrive as a plain-text first line
        let mut first = true;
        while let Some(line) = lines.next_line().await? {
            if first {
                first = false;
                let head = line.trim_start();
                if head.starts_with("error") || head.starts_with("API count exceeded") {
                    return Err(FinderError::SourceError {
                        source_name: self.name.to_string(),
                        message: head.to_string(),
                    });
                }
            }
            results.matches(&ctx.extractor, &line).await?;
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
    async fn test_host_lines() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/hostsearch/")
            .match_query(Matcher::UrlEncoded("q".into(), "example.com".into()))
            .with_body("www.example.com,93.184.216.34\nmail.example.com,93.184.216.35\n")
            .create_async()
            .await;

        let source = HackerTargetSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[])).await;

        assert_eq!(values(&events), vec!["www.example.com", "mail.example.com"]);
    }

    #[tokio::test]
    async fn test_quota_message_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/hostsearch/")
            .match_query(Matcher::Any)
            .with_body("API count exceeded - Increase Quota with Membership")
            .create_async()
            .await;

        let source = HackerTargetSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[])).await;

        assert_eq!(errors(&events).len(), 1);
        assert!(values(&events).is_empty());
    }
}
