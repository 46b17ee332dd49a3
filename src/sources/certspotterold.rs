// src/sources/certspotterold.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Certificate {
    #[serde(default)]
    dns_names: Vec<String>,
}

/// Keyless Cert Spotter v0 certificate list
#[derive(Debug, Clone)]
pub struct CertSpotterOldSource {
    name: String,
    base_url: String,
}

impl Default for CertSpotterOldSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CertSpotterOldSource {
    pub fn new() -> Self {
        Self {
            name: "certspotterold".to_string(),
            base_url: "https://certspotter.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for CertSpotterOldSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/api/v0/certs?domain={}", self.base_url, domain);
        let certificates: Vec<Certificate> = fetch_json(&self.name, &ctx.session, &url, &[]).await?;

        for certificate in certificates {
            for name in certificate.dns_names.iter().flat_map(|n| n.lines()) {
                let name = name.trim();
                if ctx.extractor.in_scope(name.trim_start_matches("*.")) {
                    results.subdomain(name).await?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::{collect, context, values};
    use mockito::Matcher;

    #[tokio::test]
    async fn test_multi_line_names_are_split() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v0/certs")
            .match_query(Matcher::UrlEncoded("domain".into(), "example.com".into()))
            .with_body(
                r#"[{"dns_names":["www.example.com\nmail.example.com"]},{"dns_names":["*.api.example.com","example.org"]},{}]"#,
            )
            .create_async()
            .await;

        let source = CertSpotterOldSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[])).await;

        assert_eq!(values(&events), vec!["www.example.com", "mail.example.com", "*.api.example.com"]);
        mock.assert_async().await;
    }
}
