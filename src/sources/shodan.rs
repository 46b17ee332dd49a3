// src/sources/shodan.rs
use crate::sources::{decode, ensure_success, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use crate::utils::qualify;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

const MAX_PAGES: u32 = 5;

#[derive(Debug, Deserialize)]
struct ShodanResponse {
    #[serde(default)]
    domain: String,
    #[serde(default)]
    subdomains: Vec<String>,
    #[serde(default)]
    more: bool,
    error: Option<String>,
}

/// Shodan DNS domain lookup
#[derive(Debug, Clone)]
pub struct ShodanSource {
    name: String,
    base_url: String,
}

impl Default for ShodanSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ShodanSource {
    pub fn new() -> Self {
        Self {
            name: "shodan".to_string(),
            base_url: "https://api.shodan.io".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for ShodanSource {
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

        let url = format!("{}/dns/domain/{}", self.base_url, domain);
        let mut page = 1;

        loop {
            let page_param = page.to_string();
            let request = ctx.session.client
                .get(&url)
                .query(&[("key", api_key.as_str()), ("page", page_param.as_str())]);

            let response = ctx.session.send(request).await?;
            if response.status().as_u16() == 429 {
                return Err(FinderError::RateLimitError(self.name.to_string()));
            }
            let response = ensure_success(&self.name, &ctx.session, response).await?;
            let text = ctx.session.text(response).await?;
            let shodan_response: ShodanResponse = decode(&text)?;

            if let Some(error) = shodan_response.error {
                return Err(FinderError::SourceError {
                    source_name: self.name.to_string(),
                    message: format!("Shodan API error: {}", error),
                });
            }

            let apex = if shodan_response.domain.is_empty() { domain } else { shodan_response.domain.as_str() };
            for subdomain in &shodan_response.subdomains {
                results.subdomain(qualify(subdomain, apex)).await?;
            }

            if shodan_response.more && page < MAX_PAGES {
                page += 1;
                continue;
            }
            break;
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
    async fn test_follows_more_flag() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/dns/domain/example.com")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "k".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_body(r#"{"domain":"example.com","subdomains":["www"],"more":true}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/dns/domain/example.com")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_body(r#"{"domain":"example.com","subdomains":["api"],"more":false}"#)
            .create_async()
            .await;

        let source = ShodanSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[("shodan", &["k"])])).await;

        assert_eq!(values(&events), vec!["www.example.com", "api.example.com"]);
    }

    #[tokio::test]
    async fn test_body_error_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/dns/domain/example.com")
            .match_query(Matcher::Any)
            .with_body(r#"{"error":"Invalid API key"}"#)
            .create_async()
            .await;

        let source = ShodanSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[("shodan", &["k"])])).await;

        let errors = errors(&events);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Invalid API key"));
    }
}
