// src/sources/crtsh.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CrtShResponse {
    #[serde(default)]
    name_value: String,
}

/// CRT.sh certificate transparency logs source
#[derive(Debug, Clone)]
pub struct CrtShSource {
    name: String,
    base_url: String,
}

impl Default for CrtShSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CrtShSource {
    pub fn new() -> Self {
        Self {
            name: "crtsh".to_string(),
            base_url: "https://crt.sh".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for CrtShSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/?q=%25.{}&output=json", self.base_url, domain);
        let records: Vec<CrtShResponse> = fetch_json(&self.name, &ctx.session, &url, &[]).await?;

        for record in records {
            // name_value can contain multiple subdomains separated by newlines
            for line in record.name_value.lines() {
                let subdomain = line.trim();
                if !subdomain.is_empty() && ctx.extractor.in_scope(subdomain.trim_start_matches("*.")) {
                    results.subdomain(subdomain).await?;
                }
            }
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
    async fn test_splits_name_values() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("output".into(), "json".into()))
            .with_body(r#"[{"id":1,"name_value":"www.example.com\n*.api.example.com"},{"id":2,"name_value":"other.org"}]"#)
            .create_async()
            .await;

        let source = CrtShSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[])).await;

        assert_eq!(values(&events), vec!["www.example.com", "*.api.example.com"]);
    }

    #[tokio::test]
    async fn test_bad_json_is_one_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_body("<html>busy</html>")
            .create_async()
            .await;

        let source = CrtShSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[])).await;

        assert_eq!(events.len(), 1);
        assert_eq!(errors(&events).len(), 1);
    }
}
