// src/sources/virustotal.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct VirusTotalResponse {
    #[serde(default)]
    data: Vec<VirusTotalData>,
    #[serde(default)]
    meta: Option<VirusTotalMeta>,
}

#[derive(Debug, Deserialize)]
struct VirusTotalData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct VirusTotalMeta {
    cursor: Option<String>,
}

/// VirusTotal v3 subdomain relationship, cursor paginated
#[derive(Debug, Clone)]
pub struct VirusTotalSource {
    name: String,
    base_url: String,
}

impl Default for VirusTotalSource {
    fn default() -> Self {
        Self::new()
    }
}

impl VirusTotalSource {
    pub fn new() -> Self {
        Self {
            name: "virustotal".to_string(),
            base_url: "https://www.virustotal.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for VirusTotalSource {
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

        let mut cursor = String::new();
        loop {
            let mut url = format!("{}/api/v3/domains/{}/subdomains?limit=40", self.base_url, domain);
            if !cursor.is_empty() {
                url.push_str(&format!("&cursor={}", urlencoding::encode(&cursor)));
            }

            let page: VirusTotalResponse =
                fetch_json(&self.name, &ctx.session, &url, &[("x-apikey", api_key.as_str())]).await?;

            if page.data.is_empty() {
                break;
            }
            for item in &page.data {
                results.subdomain(item.id.as_str()).await?;
            }

            match page.meta.and_then(|m| m.cursor) {
                Some(next) if !next.is_empty() => cursor = next,
                _ => break,
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
    async fn test_cursor_pagination() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/domains/example.com/subdomains")
            .match_query(Matcher::Regex("^limit=40$".to_string()))
            .match_header("x-apikey", "vt")
            .with_body(r#"{"data":[{"id":"a.example.com"}],"meta":{"cursor":"next1"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v3/domains/example.com/subdomains")
            .match_query(Matcher::UrlEncoded("cursor".into(), "next1".into()))
            .with_body(r#"{"data":[{"id":"b.example.com"}],"meta":{}}"#)
            .create_async()
            .await;

        let source = VirusTotalSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[("virustotal", &["vt"])])).await;

        assert_eq!(values(&events), vec!["a.example.com", "b.example.com"]);
    }
}
