// src/sources/certificatedetails.rs
use crate::sources::{fetch_lines, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;

/// certificatedetails.com certificate listing page
#[derive(Debug, Clone)]
pub struct CertificateDetailsSource {
    name: String,
    base_url: String,
}

impl Default for CertificateDetailsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateDetailsSource {
    pub fn new() -> Self {
        Self {
            name: "certificatedetails".to_string(),
            base_url: "https://certificatedetails.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for CertificateDetailsSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/{}", self.base_url, domain);
        let mut lines = fetch_lines(&self.name, &ctx.session, &url).await?;

        while let Some(line) = lines.next_line().await? {
            results.matches(&ctx.extractor, &line).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::{collect, context, errors, values};

    #[tokio::test]
    async fn test_hosts_are_scraped_from_listing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/example.com")
            .with_body(concat!(
                "<table>\n",
                "<tr><td><a href=\"/cert/1\">www.example.com</a></td></tr>\n",
                "<tr><td>*.Dev.example.com</td><td>cdn.example.org</td></tr>\n",
                "</table>\n",
            ))
            .create_async()
            .await;

        let source = CertificateDetailsSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[])).await;

        assert_eq!(values(&events), vec!["www.example.com", "*.Dev.example.com"]);
        assert!(errors(&events).is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_page_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/example.com").with_status(404).create_async().await;

        let source = CertificateDetailsSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[])).await;

        assert_eq!(errors(&events).len(), 1);
        assert!(values(&events).is_empty());
    }
}
